//! Types module
//!
//! Contains core data structures used throughout the client.
//! This module organizes types into logical submodules:
//! - `account`: Identity and account snapshot
//! - `transaction`: Ledger entries, history pages, results and statistics
//! - `session`: Credentials, auth tokens and persisted session state
//! - `error`: Error types for the client

pub mod account;
pub mod error;
pub mod session;
pub mod transaction;

pub use account::{AccountId, AccountSnapshot, Identity, UserId};
pub use error::{BankingError, Field, FieldError, FieldErrorKind, ValidationErrors};
pub use session::{AuthSession, AuthToken, Credentials, PersistedSession, Registration, SessionView};
pub use transaction::{
    CounterpartySummary, DashboardStats, Transaction, TransactionHistoryPage, TransactionId,
    TransactionKind, TransactionResult, TransactionType,
};
