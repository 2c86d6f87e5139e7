//! Transaction-related types for the SecureBank client
//!
//! This module defines ledger entries as reported by the server, history pages,
//! the server-confirmed outcome of a money movement and the dashboard statistics.

use super::account::{AccountId, AccountSnapshot};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Transaction identifier
pub type TransactionId = u64;

/// Direction of a ledger entry relative to the owning account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    /// Funds added to the account
    #[serde(alias = "credit")]
    Credit,

    /// Funds removed from the account
    #[serde(alias = "debit")]
    Debit,
}

/// Informal classification used for display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionKind {
    Deposit,
    Withdrawal,
    TransferIn,
    TransferOut,
}

/// A single immutable ledger entry
///
/// The client never edits or deletes these; ordering is whatever the server
/// returned (newest first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,

    #[serde(default)]
    pub account_id: Option<AccountId>,

    #[serde(rename = "transaction_type", alias = "type")]
    pub tx_type: TransactionType,

    /// Always positive; direction comes from `tx_type`
    pub amount: Decimal,

    #[serde(default)]
    pub description: Option<String>,

    /// Counterparty account number, present only for transfers
    #[serde(default)]
    pub counterparty_account_number: Option<String>,

    /// Counterparty display name, present only for transfers
    #[serde(default)]
    pub counterparty_name: Option<String>,

    /// Other leg of a transfer, if the server links them
    #[serde(default, alias = "related_trasaction_id")]
    pub related_transaction_id: Option<TransactionId>,

    /// Owning account's balance right after this entry, as reported by the server
    pub balance_after: Decimal,

    pub created_at: NaiveDateTime,
}

impl Transaction {
    /// Classify this entry as deposit, withdrawal or one leg of a transfer
    pub fn kind(&self) -> TransactionKind {
        let is_transfer =
            self.counterparty_account_number.is_some() || self.related_transaction_id.is_some();
        match (self.tx_type, is_transfer) {
            (TransactionType::Credit, false) => TransactionKind::Deposit,
            (TransactionType::Debit, false) => TransactionKind::Withdrawal,
            (TransactionType::Credit, true) => TransactionKind::TransferIn,
            (TransactionType::Debit, true) => TransactionKind::TransferOut,
        }
    }
}

/// One fixed-size slice of transaction history
///
/// Transient: the paginator folds it into its accumulated sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionHistoryPage {
    pub transactions: Vec<Transaction>,

    /// Page size that was requested
    pub limit: u32,

    /// Offset that was requested
    pub offset: u32,

    /// Number of transactions the server actually returned
    pub count: u32,
}

impl TransactionHistoryPage {
    /// Build a page from the server's transactions and the request that produced them
    pub fn new(transactions: Vec<Transaction>, limit: u32, offset: u32) -> Self {
        let count = u32::try_from(transactions.len()).unwrap_or(u32::MAX);
        TransactionHistoryPage {
            transactions,
            limit,
            offset,
            count,
        }
    }

    /// A short page (including an empty one) means history is exhausted
    pub fn is_last(&self) -> bool {
        self.count < self.limit
    }
}

/// Summary of the other side of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartySummary {
    pub account_number: String,

    #[serde(default)]
    pub name: Option<String>,

    pub amount: Decimal,
}

/// Server-confirmed outcome of a submitted deposit, withdrawal or transfer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub transaction_id: TransactionId,

    /// Post-transaction account state; the only source of the new balance
    pub account: AccountSnapshot,

    /// Present for transfers only
    #[serde(default)]
    pub counterparty: Option<CounterpartySummary>,
}

/// Income/expense totals over a trailing window
///
/// `Default` is the empty value shown when the stats panel fails to load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    #[serde(default)]
    pub total_income: Decimal,

    #[serde(default)]
    pub total_expenses: Decimal,

    #[serde(default)]
    pub total_transactions: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    fn entry(tx_type: TransactionType, counterparty: Option<&str>) -> Transaction {
        Transaction {
            id: 1,
            account_id: Some(1),
            tx_type,
            amount: Decimal::new(2000, 2),
            description: None,
            counterparty_account_number: counterparty.map(str::to_string),
            counterparty_name: None,
            related_transaction_id: None,
            balance_after: Decimal::new(8000, 2),
            created_at: NaiveDate::from_ymd_opt(2024, 3, 1)
                .unwrap()
                .and_hms_opt(10, 0, 0)
                .unwrap(),
        }
    }

    #[rstest]
    #[case::deposit(TransactionType::Credit, None, TransactionKind::Deposit)]
    #[case::withdrawal(TransactionType::Debit, None, TransactionKind::Withdrawal)]
    #[case::transfer_in(TransactionType::Credit, Some("ACC-000002"), TransactionKind::TransferIn)]
    #[case::transfer_out(TransactionType::Debit, Some("ACC-000002"), TransactionKind::TransferOut)]
    fn test_kind(
        #[case] tx_type: TransactionType,
        #[case] counterparty: Option<&str>,
        #[case] expected: TransactionKind,
    ) {
        assert_eq!(entry(tx_type, counterparty).kind(), expected);
    }

    #[test]
    fn test_decodes_server_transaction() {
        let json = r#"{
            "id": 9,
            "account_id": 3,
            "transaction_type": "DEBIT",
            "amount": 20.0,
            "balance_after": "80.00",
            "related_trasaction_id": 10,
            "description": "Rent",
            "created_at": "2024-03-01T10:15:00"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();

        assert_eq!(tx.tx_type, TransactionType::Debit);
        assert_eq!(tx.related_transaction_id, Some(10));
        assert_eq!(tx.balance_after, Decimal::new(8000, 2));
        assert_eq!(tx.kind(), TransactionKind::TransferOut);
    }

    #[test]
    fn test_accepts_lowercase_type() {
        let json = r#"{"id":1,"transaction_type":"credit","amount":5,"balance_after":5,
            "created_at":"2024-03-01T10:15:00.123456"}"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.tx_type, TransactionType::Credit);
        assert_eq!(tx.account_id, None);
    }

    #[rstest]
    #[case::full_page(20, 20, false)]
    #[case::short_page(5, 20, true)]
    #[case::empty_page(0, 20, true)]
    fn test_page_is_last(#[case] returned: usize, #[case] limit: u32, #[case] expected: bool) {
        let transactions = (0..returned)
            .map(|_| entry(TransactionType::Credit, None))
            .collect();
        let page = TransactionHistoryPage::new(transactions, limit, 0);
        assert_eq!(page.count as usize, returned);
        assert_eq!(page.is_last(), expected);
    }

    #[test]
    fn test_stats_default_is_zero() {
        let stats = DashboardStats::default();
        assert_eq!(stats.total_income, Decimal::ZERO);
        assert_eq!(stats.total_expenses, Decimal::ZERO);
        assert_eq!(stats.total_transactions, 0);
    }
}
