//! SecureBank Client Library
//! # Overview
//!
//! This library is the client side of a personal-banking service: it keeps the
//! signed-in session, pages through transaction history, drives deposits,
//! withdrawals and transfers, and assembles the dashboard. The server is the
//! only authority on balances; every cached balance is one the server reported.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Identity, AccountSnapshot, Transaction, errors)
//! - [`config`] - Client configuration
//! - [`cli`] - CLI argument parsing and command execution
//! - [`core`] - Business logic components:
//!   - [`core::session_store`] - Session, credential and snapshot ownership
//!   - [`core::paginator`] - Offset-paged transaction history
//!   - [`core::orchestrator`] - Money-movement state machine with a busy guard
//!   - [`core::dashboard`] - Concurrent dashboard load with partial degradation
//!   - [`core::validation`] - Local form validation
//! - [`io`] - HTTP account service, session storage and display formatting
//! - [`client`] - Wiring of all of the above for one process
//!
//! # Money movements
//!
//! - **Deposit**: validated locally, then submitted
//! - **Withdrawal**: rejected locally when above the cached balance, then submitted
//! - **Transfer**: validated, held for confirmation with a projected balance, then
//!   submitted or cancelled
//!
//! After a successful submission the session snapshot is replaced with the
//! server's snapshot. A failed submission changes nothing and is never retried.

// Module declarations
pub mod cli;
pub mod client;
pub mod config;
pub mod core;
pub mod io;
pub mod types;

pub use client::BankingClient;
pub use config::ClientConfig;
pub use crate::core::{
    AccountService, AmountForm, DashboardAggregator, DashboardView, HistoryPaginator,
    OrchestratorState, PendingOperation, SessionStorage, SessionStore, TransactionOrchestrator,
    TransferForm,
};
pub use io::{FileSessionStorage, HttpAccountService, MemorySessionStorage};
pub use types::{
    AccountId, AccountSnapshot, BankingError, Credentials, DashboardStats, Identity,
    Registration, Transaction, TransactionHistoryPage, TransactionId, TransactionResult,
    TransactionType, ValidationErrors,
};
