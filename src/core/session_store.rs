//! Session state management
//!
//! This module provides the `SessionStore`, the single owner of the signed-in
//! identity, the auth credential and the cached account snapshot.
//!
//! # Lifecycle
//!
//! ```text
//! open() ── reads persisted session ──► signed in / signed out
//!   sign_in / sign_up ──► signed in (state persisted)
//!   replace_snapshot  ──► same session, new snapshot (persisted)
//!   sign_out          ──► storage cleared, then memory cleared
//! ```
//!
//! # Mutation rules
//!
//! The snapshot is only ever replaced wholesale, never patched field by field.
//! Every replacement bumps a revision counter. Reads that started before a
//! replacement hold a [`SnapshotTicket`] for the old revision and are dropped
//! when they complete, so a slow read can never overwrite a newer mutation result.
//!
//! Observers get a [`SessionView`] through [`SessionStore::subscribe`]; the
//! view never carries the auth token.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::core::traits::{AccountService, SessionStorage};
use crate::core::validation::{validate_credentials, validate_registration};
use crate::types::{
    AccountSnapshot, AuthSession, AuthToken, BankingError, Credentials, Identity,
    PersistedSession, Registration, SessionView,
};

/// Revision marker taken before a non-mutating snapshot read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotTicket(u64);

#[derive(Debug, Default)]
struct SessionState {
    token: Option<AuthToken>,
    identity: Option<Identity>,
    snapshot: Option<AccountSnapshot>,
    revision: u64,
}

impl SessionState {
    fn view(&self) -> SessionView {
        SessionView {
            identity: self.identity.clone(),
            snapshot: self.snapshot.clone(),
            authenticated: self.is_authenticated(),
            revision: self.revision,
        }
    }

    fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.identity.is_some()
    }

    fn persisted(&self) -> Option<PersistedSession> {
        Some(PersistedSession {
            token: self.token.clone()?,
            identity: self.identity.clone()?,
            snapshot: self.snapshot.clone(),
        })
    }
}

/// Process-wide session state with a replace-only mutation API
pub struct SessionStore {
    service: Arc<dyn AccountService>,
    storage: Box<dyn SessionStorage>,
    state: Mutex<SessionState>,
    updates: watch::Sender<SessionView>,
}

impl SessionStore {
    /// Create a store, restoring any session found in `storage`
    ///
    /// A missing, unreadable or corrupt persisted session starts signed out.
    pub fn open(service: Arc<dyn AccountService>, storage: Box<dyn SessionStorage>) -> Self {
        let state = match storage.load() {
            Ok(Some(persisted)) => {
                debug!(user_id = persisted.identity.id, "Restored persisted session");
                SessionState {
                    token: Some(persisted.token),
                    identity: Some(persisted.identity),
                    snapshot: persisted.snapshot,
                    revision: 0,
                }
            }
            Ok(None) => SessionState::default(),
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable persisted session");
                SessionState::default()
            }
        };

        let (updates, _) = watch::channel(state.view());
        SessionStore {
            service,
            storage,
            state: Mutex::new(state),
            updates,
        }
    }

    /// Sign in with email and password
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed input (no request is sent), `Auth`
    /// when the credentials are rejected, or a transport/server error. On any
    /// error the prior session state is left untouched.
    pub async fn sign_in(
        &self,
        credentials: &Credentials,
    ) -> Result<(Identity, AccountSnapshot), BankingError> {
        validate_credentials(credentials)?;
        let session = self
            .service
            .login(credentials.email.trim(), &credentials.password)
            .await?;
        Ok(self.install(session))
    }

    /// Register a new user and account, then sign in as that user
    ///
    /// The initial deposit becomes the opening balance; the server enforces it.
    ///
    /// # Errors
    ///
    /// Same contract as [`SessionStore::sign_in`].
    pub async fn sign_up(
        &self,
        registration: &Registration,
    ) -> Result<(Identity, AccountSnapshot), BankingError> {
        let request = validate_registration(registration)?;
        let session = self.service.register(&request).await?;
        Ok(self.install(session))
    }

    fn install(&self, session: AuthSession) -> (Identity, AccountSnapshot) {
        let AuthSession {
            identity,
            token,
            snapshot,
        } = session;

        let mut state = self.lock();
        state.token = Some(token);
        state.identity = Some(identity.clone());
        state.snapshot = Some(snapshot.clone());
        state.revision += 1;
        self.persist(&state);
        self.publish(&state);
        drop(state);

        info!(user_id = identity.id, account = %snapshot.account_number, "Signed in");
        (identity, snapshot)
    }

    /// Clear the session
    ///
    /// Durable storage is cleared before in-memory state, and both are done
    /// by the time this returns. Never fails and is safe to call repeatedly.
    pub fn sign_out(&self) {
        if let Err(e) = self.storage.clear() {
            warn!(error = %e, "Failed to clear persisted session");
        }

        let mut state = self.lock();
        let was_signed_in = state.is_authenticated();
        state.token = None;
        state.identity = None;
        state.snapshot = None;
        state.revision += 1;
        self.publish(&state);
        drop(state);

        if was_signed_in {
            info!("Signed out");
        }
    }

    /// Overwrite the cached snapshot with a server-returned one
    ///
    /// Used after a successful mutation. The snapshot is taken as-is; nothing
    /// is merged. Ignored (returning `false`) when no session is active, so a
    /// response that lands after sign-out cannot resurrect the session.
    pub fn replace_snapshot(&self, snapshot: AccountSnapshot) -> bool {
        let mut state = self.lock();
        if !state.is_authenticated() {
            warn!(
                account = %snapshot.account_number,
                "Discarding snapshot received after sign-out"
            );
            return false;
        }
        Self::commit(&mut state, snapshot);
        self.persist(&state);
        self.publish(&state);
        true
    }

    /// Take a ticket before starting a non-mutating snapshot read
    pub fn read_ticket(&self) -> SnapshotTicket {
        SnapshotTicket(self.lock().revision)
    }

    /// Apply a fetched snapshot unless something replaced it since `ticket`
    ///
    /// Returns `false` when the fetched snapshot was stale and dropped.
    pub fn apply_fetched_snapshot(
        &self,
        ticket: SnapshotTicket,
        snapshot: AccountSnapshot,
    ) -> bool {
        let mut state = self.lock();
        if state.revision != ticket.0 {
            warn!(
                ticket = ticket.0,
                revision = state.revision,
                "Discarding stale account snapshot"
            );
            return false;
        }
        if !state.is_authenticated() {
            return false;
        }
        Self::commit(&mut state, snapshot);
        self.persist(&state);
        self.publish(&state);
        true
    }

    fn commit(state: &mut SessionState, snapshot: AccountSnapshot) {
        debug!(
            account = %snapshot.account_number,
            balance = %snapshot.balance,
            "Replacing account snapshot"
        );
        state.snapshot = Some(snapshot);
        state.revision += 1;
    }

    /// Whether a signed-in session is present
    pub fn is_authenticated(&self) -> bool {
        self.lock().is_authenticated()
    }

    /// Current auth credential
    pub fn token(&self) -> Option<AuthToken> {
        self.lock().token.clone()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.lock().identity.clone()
    }

    /// Last server-reported account snapshot
    pub fn snapshot(&self) -> Option<AccountSnapshot> {
        self.lock().snapshot.clone()
    }

    /// Current read-only view
    pub fn view(&self) -> SessionView {
        self.lock().view()
    }

    /// Subscribe to session changes
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.updates.subscribe()
    }

    /// Credential and snapshot needed by any account call
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` when there is no session or no account snapshot.
    pub fn require_session(&self) -> Result<(AuthToken, AccountSnapshot), BankingError> {
        let state = self.lock();
        match (&state.token, &state.identity, &state.snapshot) {
            (Some(token), Some(_), Some(snapshot)) => Ok((token.clone(), snapshot.clone())),
            _ => Err(BankingError::NotSignedIn),
        }
    }

    fn persist(&self, state: &SessionState) {
        if let Some(persisted) = state.persisted() {
            if let Err(e) = self.storage.save(&persisted) {
                warn!(error = %e, "Failed to persist session");
            }
        }
    }

    fn publish(&self, state: &SessionState) {
        self.updates.send_replace(state.view());
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("view", &self.view())
            .finish_non_exhaustive()
    }
}
