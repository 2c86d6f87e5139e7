//! Account-related types for the SecureBank client
//!
//! This module defines the authenticated identity and the account snapshot
//! the remote account service reports.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// User identifier assigned by the auth service
///
/// Opaque to the client; only ever echoed back to the server.
pub type UserId = u64;

/// Account identifier assigned by the account service
pub type AccountId = u64;

/// The signed-in user
///
/// Set on sign-in/sign-up, cleared on sign-out. The client never edits it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Opaque user id
    pub id: UserId,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Email the user signs in with
    pub email: String,
}

/// Point-in-time account record as last reported by the server
///
/// Replaced wholesale on every successful fetch or mutation response and never
/// field-patched. Only server-reported balances are ever stored here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account id used in API paths
    pub id: AccountId,

    /// Globally unique account number (e.g. `ACC-000042`), stable for the account's lifetime
    pub account_number: String,

    /// Authoritative balance as reported by the server
    pub balance: Decimal,
}

impl AccountSnapshot {
    /// Create a snapshot from server-reported values
    pub fn new(id: AccountId, account_number: impl Into<String>, balance: Decimal) -> Self {
        AccountSnapshot {
            id,
            account_number: account_number.into(),
            balance,
        }
    }

    /// Whether `account_number` names this account
    ///
    /// Comparison ignores surrounding whitespace and ASCII case.
    pub fn is_own_account_number(&self, account_number: &str) -> bool {
        self.account_number
            .trim()
            .eq_ignore_ascii_case(account_number.trim())
    }
}
