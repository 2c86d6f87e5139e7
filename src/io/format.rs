//! Text formatting for amounts, account numbers, dates and descriptions

use chrono::NaiveDateTime;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::types::{AccountId, TransactionType};

/// Format a USD amount: `$1,234.50`, `-$3.00`
pub fn format_currency(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };
    let digits = format!("{:.2}", rounded.abs());
    let (whole, cents) = digits.split_once('.').unwrap_or((digits.as_str(), "00"));
    format!("{sign}${}.{cents}", group_thousands(whole))
}

/// Format a ledger amount with its direction: `+$50.00` / `-$20.00`
pub fn format_transaction_amount(amount: Decimal, tx_type: TransactionType) -> String {
    let formatted = format_currency(amount.abs());
    match tx_type {
        TransactionType::Credit => format!("+{formatted}"),
        TransactionType::Debit => format!("-{formatted}"),
    }
}

/// Display form of an account number derived from its id, e.g. `ACC-000042`
pub fn format_account_number(account_id: AccountId) -> String {
    format!("ACC-{account_id:06}")
}

/// Short timestamp such as `Jan 5, 3:07 PM`
pub fn format_date(timestamp: &NaiveDateTime) -> String {
    timestamp.format("%b %-d, %-I:%M %p").to_string()
}

/// Cut `text` to `max_len` characters, appending `...` when shortened
pub fn truncate(text: &str, max_len: usize) -> String {
    match text.char_indices().nth(max_len) {
        Some((byte_index, _)) => format!("{}...", &text[..byte_index]),
        None => text.to_string(),
    }
}

fn group_thousands(whole: &str) -> String {
    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rstest::rstest;

    #[rstest]
    #[case::zero(Decimal::ZERO, "$0.00")]
    #[case::cents(Decimal::new(5, 2), "$0.05")]
    #[case::whole(Decimal::new(100, 0), "$100.00")]
    #[case::thousands(Decimal::new(123450, 2), "$1,234.50")]
    #[case::millions(Decimal::new(123456789, 2), "$1,234,567.89")]
    #[case::rounds_half_up(Decimal::new(10005, 3), "$10.01")]
    #[case::negative(Decimal::new(-300, 2), "-$3.00")]
    #[case::negative_rounds_to_zero(Decimal::new(-1, 3), "$0.00")]
    fn test_format_currency(#[case] amount: Decimal, #[case] expected: &str) {
        assert_eq!(format_currency(amount), expected);
    }

    #[rstest]
    #[case::credit(Decimal::new(50, 0), TransactionType::Credit, "+$50.00")]
    #[case::debit(Decimal::new(20, 0), TransactionType::Debit, "-$20.00")]
    #[case::debit_already_negative(Decimal::new(-20, 0), TransactionType::Debit, "-$20.00")]
    fn test_format_transaction_amount(
        #[case] amount: Decimal,
        #[case] tx_type: TransactionType,
        #[case] expected: &str,
    ) {
        assert_eq!(format_transaction_amount(amount, tx_type), expected);
    }

    #[rstest]
    #[case::small(42, "ACC-000042")]
    #[case::padded(1, "ACC-000001")]
    #[case::wide(1234567, "ACC-1234567")]
    fn test_format_account_number(#[case] id: AccountId, #[case] expected: &str) {
        assert_eq!(format_account_number(id), expected);
    }

    #[rstest]
    #[case::afternoon(15, 7, "Jan 5, 3:07 PM")]
    #[case::midnight(0, 30, "Jan 5, 12:30 AM")]
    fn test_format_date(#[case] hour: u32, #[case] minute: u32, #[case] expected: &str) {
        let timestamp = NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap();
        assert_eq!(format_date(&timestamp), expected);
    }

    #[rstest]
    #[case::short("Rent", 10, "Rent")]
    #[case::exact("abcde", 5, "abcde")]
    #[case::long("Monthly rent payment", 7, "Monthly...")]
    #[case::multibyte("café crème brûlée", 4, "café...")]
    fn test_truncate(#[case] text: &str, #[case] max_len: usize, #[case] expected: &str) {
        assert_eq!(truncate(text, max_len), expected);
    }
}
