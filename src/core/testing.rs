//! In-memory account service for tests
//!
//! `FakeAccountService` behaves like a tiny remote ledger: it keeps a
//! server-side balance and a newest-first history, counts every call, and can
//! be scripted to fail, to report a specific post-transaction balance, or to
//! block until released so tests can observe in-flight states.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use tokio::sync::Notify;

use crate::core::traits::{AccountService, MovementRequest, RegistrationRequest, TransferRequest};
use crate::types::{
    AccountId, AccountSnapshot, AuthSession, AuthToken, BankingError, CounterpartySummary,
    DashboardStats, Identity, PersistedSession, Transaction, TransactionHistoryPage,
    TransactionResult, TransactionType,
};

/// Token the fake issues and accepts
pub const FAKE_TOKEN: &str = "fake-token";

/// Number of calls made to each endpoint
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub login: usize,
    pub register: usize,
    pub account: usize,
    pub history: usize,
    pub stats: usize,
    pub deposit: usize,
    pub withdraw: usize,
    pub transfer: usize,
}

impl CallCounts {
    /// Total mutating calls
    pub fn mutations(&self) -> usize {
        self.deposit + self.withdraw + self.transfer
    }
}

#[derive(Debug)]
struct FakeState {
    identity: Identity,
    snapshot: AccountSnapshot,
    ledger: Vec<Transaction>,
    next_id: u64,
    stats: DashboardStats,
    calls: CallCounts,
    login_error: Option<BankingError>,
    account_error: Option<BankingError>,
    history_error: Option<BankingError>,
    stats_error: Option<BankingError>,
    mutation_errors: VecDeque<BankingError>,
    refresh_errors: VecDeque<BankingError>,
    next_balances: VecDeque<Decimal>,
    counterparty_name: Option<String>,
}

/// Scriptable stand-in for the remote account service
#[derive(Debug)]
pub struct FakeAccountService {
    state: Mutex<FakeState>,
    mutation_gate: Mutex<Option<Arc<Notify>>>,
    account_gate: Mutex<Option<Arc<Notify>>>,
}

impl Default for FakeAccountService {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeAccountService {
    /// Account `ACC-000001` (id 1) holding $100.00 with an empty history
    pub fn new() -> Self {
        Self::with_balance(Decimal::new(10000, 2))
    }

    pub fn with_balance(balance: Decimal) -> Self {
        FakeAccountService {
            state: Mutex::new(FakeState {
                identity: Identity {
                    id: 1,
                    name: "Ada Lovelace".to_string(),
                    email: "ada@example.com".to_string(),
                },
                snapshot: AccountSnapshot::new(1, "ACC-000001", balance),
                ledger: Vec::new(),
                next_id: 1,
                stats: DashboardStats::default(),
                calls: CallCounts::default(),
                login_error: None,
                account_error: None,
                history_error: None,
                stats_error: None,
                mutation_errors: VecDeque::new(),
                refresh_errors: VecDeque::new(),
                next_balances: VecDeque::new(),
                counterparty_name: None,
            }),
            mutation_gate: Mutex::new(None),
            account_gate: Mutex::new(None),
        }
    }

    /// Seed `count` historical credits, newest first
    pub fn seed_history(&self, count: usize) {
        let mut state = self.lock();
        for _ in 0..count {
            let id = state.next_id;
            state.next_id += 1;
            let balance = state.snapshot.balance;
            let entry = entry(id, TransactionType::Credit, Decimal::ONE, balance, None);
            state.ledger.insert(0, entry);
        }
    }

    /// Session matching what sign-in would produce
    pub fn persisted_session(&self) -> PersistedSession {
        let state = self.lock();
        PersistedSession {
            token: AuthToken::new(FAKE_TOKEN),
            identity: state.identity.clone(),
            snapshot: Some(state.snapshot.clone()),
        }
    }

    pub fn calls(&self) -> CallCounts {
        self.lock().calls
    }

    pub fn server_balance(&self) -> Decimal {
        self.lock().snapshot.balance
    }

    /// Set the balance held server-side, as if another session moved money
    pub fn set_server_balance(&self, balance: Decimal) {
        self.lock().snapshot.balance = balance;
    }

    pub fn set_stats(&self, stats: DashboardStats) {
        self.lock().stats = stats;
    }

    pub fn set_counterparty_name(&self, name: &str) {
        self.lock().counterparty_name = Some(name.to_string());
    }

    /// Make every login/register fail with `error` until cleared
    pub fn fail_login(&self, error: BankingError) {
        self.lock().login_error = Some(error);
    }

    pub fn fail_account(&self, error: Option<BankingError>) {
        self.lock().account_error = error;
    }

    pub fn fail_history(&self, error: Option<BankingError>) {
        self.lock().history_error = error;
    }

    pub fn fail_stats(&self, error: Option<BankingError>) {
        self.lock().stats_error = error;
    }

    /// Fail the next mutation with `error`
    pub fn fail_next_mutation(&self, error: BankingError) {
        self.lock().mutation_errors.push_back(error);
    }

    /// Apply the next mutation, then fail reading its new balance back with `cause`
    pub fn fail_next_refresh(&self, cause: BankingError) {
        self.lock().refresh_errors.push_back(cause);
    }

    /// Report `balance` as the result of the next mutation, e.g. to model a fee
    pub fn script_next_balance(&self, balance: Decimal) {
        self.lock().next_balances.push_back(balance);
    }

    /// Block mutations until the returned handle is notified
    pub fn gate_mutations(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.mutation_gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(gate.clone());
        gate
    }

    /// Block account fetches until the returned handle is notified
    pub fn gate_account(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.account_gate.lock().unwrap_or_else(PoisonError::into_inner) = Some(gate.clone());
        gate
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn wait(gate: &Mutex<Option<Arc<Notify>>>) {
        let gate = gate.lock().unwrap_or_else(PoisonError::into_inner).clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }
    }

    fn check_token(token: &AuthToken) -> Result<(), BankingError> {
        if token.as_str() == FAKE_TOKEN {
            Ok(())
        } else {
            Err(BankingError::auth("Session expired. Please sign in again."))
        }
    }

    fn auth_session(state: &FakeState) -> AuthSession {
        AuthSession {
            identity: state.identity.clone(),
            token: AuthToken::new(FAKE_TOKEN),
            snapshot: state.snapshot.clone(),
        }
    }

    fn apply(
        &self,
        tx_type: TransactionType,
        amount: Decimal,
        counterparty: Option<&str>,
    ) -> Result<TransactionResult, BankingError> {
        let mut state = self.lock();
        if let Some(error) = state.mutation_errors.pop_front() {
            return Err(error);
        }
        if tx_type == TransactionType::Debit && amount > state.snapshot.balance {
            return Err(BankingError::server(400, "Insufficient funds"));
        }

        let computed = match tx_type {
            TransactionType::Credit => state.snapshot.balance + amount,
            TransactionType::Debit => state.snapshot.balance - amount,
        };
        let balance = state.next_balances.pop_front().unwrap_or(computed);
        state.snapshot.balance = balance;

        let id = state.next_id;
        state.next_id += 1;
        let entry = entry(id, tx_type, amount, balance, counterparty);
        state.ledger.insert(0, entry);
        if let Some(cause) = state.refresh_errors.pop_front() {
            return Err(BankingError::balance_unavailable(id, &cause));
        }

        let counterparty = counterparty.map(|account_number| CounterpartySummary {
            account_number: account_number.to_string(),
            name: state.counterparty_name.clone(),
            amount,
        });
        Ok(TransactionResult {
            transaction_id: id,
            account: state.snapshot.clone(),
            counterparty,
        })
    }
}

fn entry(
    id: u64,
    tx_type: TransactionType,
    amount: Decimal,
    balance_after: Decimal,
    counterparty: Option<&str>,
) -> Transaction {
    Transaction {
        id,
        account_id: Some(1),
        tx_type,
        amount,
        description: None,
        counterparty_account_number: counterparty.map(str::to_string),
        counterparty_name: None,
        related_transaction_id: None,
        balance_after,
        created_at: timestamp(id),
    }
}

fn timestamp(id: u64) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|base| base + chrono::Duration::minutes(i64::try_from(id).unwrap_or(0)))
        .unwrap_or(NaiveDateTime::MIN)
}

#[async_trait]
impl AccountService for FakeAccountService {
    async fn login(&self, email: &str, _password: &str) -> Result<AuthSession, BankingError> {
        let mut state = self.lock();
        state.calls.login += 1;
        if let Some(error) = state.login_error.clone() {
            return Err(error);
        }
        state.identity.email = email.to_string();
        Ok(Self::auth_session(&state))
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<AuthSession, BankingError> {
        let mut state = self.lock();
        state.calls.register += 1;
        if let Some(error) = state.login_error.clone() {
            return Err(error);
        }
        state.identity.name = request.name.clone();
        state.identity.email = request.email.clone();
        state.snapshot.balance = request.initial_deposit;
        Ok(Self::auth_session(&state))
    }

    async fn fetch_account(
        &self,
        token: &AuthToken,
        _account_id: AccountId,
    ) -> Result<AccountSnapshot, BankingError> {
        self.lock().calls.account += 1;
        Self::check_token(token)?;
        // Read the balance before waiting so a gated fetch returns a stale value.
        let snapshot = {
            let state = self.lock();
            if let Some(error) = state.account_error.clone() {
                return Err(error);
            }
            state.snapshot.clone()
        };
        Self::wait(&self.account_gate).await;
        Ok(snapshot)
    }

    async fn fetch_history(
        &self,
        token: &AuthToken,
        _account_id: AccountId,
        limit: u32,
        offset: u32,
    ) -> Result<TransactionHistoryPage, BankingError> {
        let mut state = self.lock();
        state.calls.history += 1;
        Self::check_token(token)?;
        if let Some(error) = state.history_error.clone() {
            return Err(error);
        }
        let transactions = state
            .ledger
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(TransactionHistoryPage::new(transactions, limit, offset))
    }

    async fn fetch_stats(
        &self,
        token: &AuthToken,
        _account_id: AccountId,
        _days: u32,
    ) -> Result<DashboardStats, BankingError> {
        let mut state = self.lock();
        state.calls.stats += 1;
        Self::check_token(token)?;
        if let Some(error) = state.stats_error.clone() {
            return Err(error);
        }
        Ok(state.stats.clone())
    }

    async fn deposit(
        &self,
        token: &AuthToken,
        request: &MovementRequest,
    ) -> Result<TransactionResult, BankingError> {
        self.lock().calls.deposit += 1;
        Self::check_token(token)?;
        Self::wait(&self.mutation_gate).await;
        self.apply(TransactionType::Credit, request.amount, None)
    }

    async fn withdraw(
        &self,
        token: &AuthToken,
        request: &MovementRequest,
    ) -> Result<TransactionResult, BankingError> {
        self.lock().calls.withdraw += 1;
        Self::check_token(token)?;
        Self::wait(&self.mutation_gate).await;
        self.apply(TransactionType::Debit, request.amount, None)
    }

    async fn transfer(
        &self,
        token: &AuthToken,
        request: &TransferRequest,
    ) -> Result<TransactionResult, BankingError> {
        self.lock().calls.transfer += 1;
        Self::check_token(token)?;
        Self::wait(&self.mutation_gate).await;
        self.apply(
            TransactionType::Debit,
            request.amount,
            Some(&request.to_account_number),
        )
    }
}
