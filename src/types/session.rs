//! Session-related types: credentials, auth results and persisted state

use super::account::{AccountSnapshot, Identity};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bearer credential issued by the auth service
///
/// `Debug` never prints the token itself.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(token: impl Into<String>) -> Self {
        AuthToken(token.into())
    }

    /// Raw token for the `Authorization` header
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(<redacted>)")
    }
}

/// Sign-in form input
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Credentials {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Sign-up form input, exactly as typed
///
/// `initial_deposit` stays text until validation parses it.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub initial_deposit: String,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("initial_deposit", &self.initial_deposit)
            .finish_non_exhaustive()
    }
}

/// What the auth endpoints return on success
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSession {
    pub identity: Identity,
    pub token: AuthToken,
    pub snapshot: AccountSnapshot,
}

/// Session as written to durable client-side storage
///
/// Field names are the fixed storage keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSession {
    #[serde(rename = "authToken")]
    pub token: AuthToken,

    #[serde(rename = "user")]
    pub identity: Identity,

    #[serde(rename = "account", default)]
    pub snapshot: Option<AccountSnapshot>,
}

/// Read-only view of the session handed to observers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionView {
    pub identity: Option<Identity>,
    pub snapshot: Option<AccountSnapshot>,
    pub authenticated: bool,

    /// Bumped on every snapshot replacement, sign-in and sign-out
    pub revision: u64,
}
