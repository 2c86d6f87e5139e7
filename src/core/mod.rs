//! Core business logic module
//!
//! This module contains the client-side banking components:
//! - `traits` - Seams for the remote account service and session storage
//! - `validation` - Local, field-scoped form validation
//! - `session_store` - Session state owner with a replace-only snapshot API
//! - `paginator` - Offset-paged transaction history
//! - `orchestrator` - Deposit / withdraw / transfer state machine
//! - `dashboard` - Concurrent account, history and statistics load
//! - `testing` - Scriptable in-memory account service (tests and `test-support`)

pub mod dashboard;
pub mod orchestrator;
pub mod paginator;
pub mod session_store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
pub mod validation;

pub use dashboard::{DashboardAggregator, DashboardView, DegradedPanel, Panel};
pub use orchestrator::{OperationKind, OrchestratorState, PendingOperation, TransactionOrchestrator};
pub use paginator::HistoryPaginator;
pub use session_store::{SessionStore, SnapshotTicket};
pub use traits::{
    AccountService, MovementRequest, RegistrationRequest, SessionStorage, TransferRequest,
};
pub use validation::{AmountForm, TransferForm, ValidatedMovement, ValidatedTransfer};
