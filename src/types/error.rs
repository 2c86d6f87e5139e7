//! Error types for the SecureBank client
//!
//! This module defines every error the client can surface. Each one renders
//! as a human-readable message suitable for showing to the user as-is.
//!
//! # Error Categories
//!
//! - **Validation Errors**: Local, field-scoped form problems; never reach the network
//! - **Auth Errors**: Credential rejected or session expired
//! - **Network Errors**: The request could not complete
//! - **Server Errors**: The request completed with a rejection and a reason
//! - **Workflow Errors**: Busy guard rejections, nothing pending to confirm, no session
//! - **Committed Errors**: The server applied the operation but its follow-up read failed

use super::transaction::TransactionId;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Form field a validation message belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Email,
    Password,
    ConfirmPassword,
    InitialDeposit,
    Amount,
    Destination,
}

impl Field {
    fn label(self) -> &'static str {
        match self {
            Field::Name => "Name",
            Field::Email => "Email",
            Field::Password => "Password",
            Field::ConfirmPassword => "Password confirmation",
            Field::InitialDeposit => "Initial deposit",
            Field::Amount => "Amount",
            Field::Destination => "Account number",
        }
    }
}

/// What is wrong with a single field
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldErrorKind {
    /// Field left blank
    Required,

    /// Text that does not parse as a decimal amount
    NotANumber,

    /// Zero or negative where a positive amount is required
    NonPositive,

    /// Negative where zero is allowed
    Negative,

    /// Amount exceeds the cached balance (client-side pre-check only)
    InsufficientBalance {
        available: Decimal,
        requested: Decimal,
    },

    /// Transfer destination is the sender's own account
    OwnAccount,

    InvalidEmail,

    TooShort {
        min: usize,
    },

    TooLong {
        max: usize,
    },

    /// Password confirmation differs from the password
    Mismatch,
}

/// A validation message scoped to one form field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: Field,
    pub kind: FieldErrorKind,
}

impl FieldError {
    pub fn new(field: Field, kind: FieldErrorKind) -> Self {
        FieldError { field, kind }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = self.field.label();
        match &self.kind {
            FieldErrorKind::Required => write!(f, "{} is required", label),
            FieldErrorKind::NotANumber => f.write_str("Please enter a valid amount"),
            FieldErrorKind::NonPositive => write!(f, "{} must be greater than 0", label),
            FieldErrorKind::Negative => f.write_str("Amount must be positive"),
            FieldErrorKind::InsufficientBalance { .. } => f.write_str("Insufficient balance"),
            FieldErrorKind::OwnAccount => f.write_str("Cannot transfer to your own account"),
            FieldErrorKind::InvalidEmail => f.write_str("Please enter a valid email"),
            FieldErrorKind::TooShort { min } => {
                write!(f, "{} must be at least {} characters", label, min)
            }
            FieldErrorKind::TooLong { max } => {
                write!(f, "{} must be less than {} characters", label, max)
            }
            FieldErrorKind::Mismatch => f.write_str("Passwords do not match"),
        }
    }
}

/// All field-level problems found in one form submission
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a problem with `field`
    pub fn add(&mut self, field: Field, kind: FieldErrorKind) {
        self.errors.push(FieldError::new(field, kind));
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    /// The first message recorded for `field`, if any
    pub fn for_field(&self, field: Field) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    /// Available and requested amounts when the balance pre-check failed
    pub fn insufficient_funds(&self) -> Option<(Decimal, Decimal)> {
        self.errors.iter().find_map(|e| match e.kind {
            FieldErrorKind::InsufficientBalance {
                available,
                requested,
            } => Some((available, requested)),
            _ => None,
        })
    }

    /// `Ok(value)` when nothing was recorded, otherwise the collected errors
    pub fn into_result<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, error) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", error)?;
        }
        Ok(())
    }
}

/// Main error type for the client
///
/// Every variant renders as a message the user can read; server reasons are
/// passed through verbatim.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BankingError {
    /// One or more form fields failed local validation
    ///
    /// Resolved before any network call and never logged as a failure.
    #[error("{0}")]
    Validation(ValidationErrors),

    /// Credentials rejected or session expired
    #[error("{message}")]
    Auth {
        /// Reason from the auth service
        message: String,
    },

    /// The request could not complete (connect failure, timeout, reset)
    #[error("{message}")]
    Network {
        /// Description of the transport failure
        message: String,
    },

    /// The server completed the request with a rejection
    #[error("{message}")]
    Server {
        /// HTTP status code
        status: u16,
        /// Reason from the server
        message: String,
    },

    /// A success response whose body could not be understood
    #[error("Unexpected response from server: {message}")]
    InvalidResponse {
        /// Decoding failure
        message: String,
    },

    /// Reading or writing the persisted session failed
    #[error("Session storage error: {message}")]
    Storage {
        /// Description of the storage failure
        message: String,
    },

    /// The client could not be set up (bad server URL, TLS backend)
    #[error("Invalid client configuration: {message}")]
    Config {
        /// What was wrong
        message: String,
    },

    /// A money movement is already being submitted
    #[error("Another transaction is already being processed")]
    Busy,

    /// The operation needs a signed-in session
    #[error("Not signed in. Please sign in to continue.")]
    NotSignedIn,

    /// Confirm or cancel was requested with no transfer awaiting confirmation
    #[error("There is no pending transfer to confirm")]
    NothingToConfirm,

    /// The server applied the transaction, but the new balance could not be read back
    ///
    /// The money movement is final; resubmitting it would repeat it.
    #[error(
        "Transaction #{transaction_id} completed, but the new balance could not be loaded \
         ({message}). Refresh the dashboard to see it."
    )]
    BalanceUnavailable {
        /// Id the server assigned to the completed transaction
        transaction_id: TransactionId,
        /// Why the account could not be re-read
        message: String,
    },
}

impl From<ValidationErrors> for BankingError {
    fn from(errors: ValidationErrors) -> Self {
        BankingError::Validation(errors)
    }
}

impl From<std::io::Error> for BankingError {
    fn from(error: std::io::Error) -> Self {
        BankingError::Storage {
            message: error.to_string(),
        }
    }
}

impl From<serde_json::Error> for BankingError {
    fn from(error: serde_json::Error) -> Self {
        BankingError::Storage {
            message: error.to_string(),
        }
    }
}

impl From<url::ParseError> for BankingError {
    fn from(error: url::ParseError) -> Self {
        BankingError::config(format!("invalid server URL ({error})"))
    }
}

impl From<reqwest::Error> for BankingError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            BankingError::invalid_response(error.to_string())
        } else if error.is_timeout() {
            BankingError::network("The request timed out. Please try again.")
        } else if error.is_connect() {
            BankingError::network("Cannot connect to server. Please try again.")
        } else {
            BankingError::network(error.to_string())
        }
    }
}

// Helper functions for creating common errors

impl BankingError {
    /// Create an Auth error
    pub fn auth(message: impl Into<String>) -> Self {
        BankingError::Auth {
            message: message.into(),
        }
    }

    /// Create a Network error
    pub fn network(message: impl Into<String>) -> Self {
        BankingError::Network {
            message: message.into(),
        }
    }

    /// Create a Server error
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        BankingError::Server {
            status,
            message: message.into(),
        }
    }

    /// Create an InvalidResponse error
    pub fn invalid_response(message: impl Into<String>) -> Self {
        BankingError::InvalidResponse {
            message: message.into(),
        }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        BankingError::Storage {
            message: message.into(),
        }
    }

    /// Create a Config error
    pub fn config(message: impl Into<String>) -> Self {
        BankingError::Config {
            message: message.into(),
        }
    }

    /// Create a BalanceUnavailable error for a completed transaction
    pub fn balance_unavailable(transaction_id: TransactionId, cause: &BankingError) -> Self {
        BankingError::BalanceUnavailable {
            transaction_id,
            message: cause.to_string(),
        }
    }

    /// Whether the server committed the operation despite the error
    pub fn is_committed(&self) -> bool {
        matches!(self, BankingError::BalanceUnavailable { .. })
    }

    /// Whether this failure happened locally, before any request was sent
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            BankingError::Validation(_)
                | BankingError::Busy
                | BankingError::NotSignedIn
                | BankingError::NothingToConfirm
                | BankingError::Config { .. }
        )
    }

    /// Field-level errors, if this is a validation failure
    pub fn validation_errors(&self) -> Option<&ValidationErrors> {
        match self {
            BankingError::Validation(errors) => Some(errors),
            _ => None,
        }
    }
}
