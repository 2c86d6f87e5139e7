//! Core traits for the remote account service and durable session storage
//!
//! These are the seams between the orchestration layer and the outside world.
//! The HTTP and file-backed implementations live in `io`; tests plug in fakes.

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::types::{
    AccountId, AccountSnapshot, AuthSession, AuthToken, BankingError, DashboardStats,
    PersistedSession, TransactionHistoryPage, TransactionResult,
};

/// Validated sign-up payload
#[derive(Clone, PartialEq, Eq)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub initial_deposit: Decimal,
}

impl std::fmt::Debug for RegistrationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationRequest")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("initial_deposit", &self.initial_deposit)
            .finish_non_exhaustive()
    }
}

/// Validated deposit or withdrawal payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovementRequest {
    pub account_id: AccountId,
    pub amount: Decimal,
    pub description: String,
}

/// Validated transfer-by-account-number payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub from_account_id: AccountId,
    pub to_account_number: String,
    pub amount: Decimal,
    pub description: String,
}

/// Typed contract of the remote auth/account/transaction API
///
/// Every call is one request. Implementations never retry mutations.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// `POST /auth/login`
    async fn login(&self, email: &str, password: &str) -> Result<AuthSession, BankingError>;

    /// `POST /auth/register`
    async fn register(&self, request: &RegistrationRequest) -> Result<AuthSession, BankingError>;

    /// `GET /accounts/{id}`
    async fn fetch_account(
        &self,
        token: &AuthToken,
        account_id: AccountId,
    ) -> Result<AccountSnapshot, BankingError>;

    /// `GET /accounts/{id}/history?limit&offset`
    async fn fetch_history(
        &self,
        token: &AuthToken,
        account_id: AccountId,
        limit: u32,
        offset: u32,
    ) -> Result<TransactionHistoryPage, BankingError>;

    /// `GET /accounts/{id}/stats?days`
    async fn fetch_stats(
        &self,
        token: &AuthToken,
        account_id: AccountId,
        days: u32,
    ) -> Result<DashboardStats, BankingError>;

    /// `POST /transactions/deposit`
    async fn deposit(
        &self,
        token: &AuthToken,
        request: &MovementRequest,
    ) -> Result<TransactionResult, BankingError>;

    /// `POST /transactions/withdraw`
    async fn withdraw(
        &self,
        token: &AuthToken,
        request: &MovementRequest,
    ) -> Result<TransactionResult, BankingError>;

    /// `POST /transactions/transfer-by-account`
    async fn transfer(
        &self,
        token: &AuthToken,
        request: &TransferRequest,
    ) -> Result<TransactionResult, BankingError>;
}

/// Durable client-side storage for the session
///
/// Synchronous by contract: sign-out must have cleared storage before it returns.
pub trait SessionStorage: Send + Sync {
    /// Read the persisted session, `None` if nothing is stored
    fn load(&self) -> Result<Option<PersistedSession>, BankingError>;

    /// Overwrite the persisted session
    fn save(&self, session: &PersistedSession) -> Result<(), BankingError>;

    /// Remove every stored key; clearing an empty store succeeds
    fn clear(&self) -> Result<(), BankingError>;
}
