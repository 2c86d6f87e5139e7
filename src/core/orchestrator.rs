//! Money-movement orchestration
//!
//! This module provides the `TransactionOrchestrator`, the state machine that
//! drives deposits, withdrawals and transfers through
//! validate → (confirm) → submit → reconcile.
//!
//! # States
//!
//! ```text
//!            ┌────────── invalid form ──────────► Invalid
//!            │
//! Idle ──────┼── deposit / withdraw ───────────► Submitting ──► Idle   (success)
//!            │                                        │
//!            └── transfer ──► AwaitingConfirmation ───┘  └──► Failed (error)
//!                                    │ cancel
//!                                    ▼
//!                                   Idle
//! ```
//!
//! Validation is synchronous and happens inside the call that starts an
//! operation, so it has no state of its own.
//!
//! # Invariants
//!
//! - At most one mutation is in flight. A submit, confirm or cancel arriving
//!   while `Submitting` is rejected with `BankingError::Busy` and sends nothing.
//! - The session snapshot is only ever replaced with the snapshot the server
//!   returns. The transfer's projected balance is advisory and never stored.
//! - A failed submission leaves the snapshot untouched and discards the
//!   operation; nothing is retried.
//! - `Submitting` always ends in `Idle` or `Failed`, even when the submitting
//!   future is dropped before the server answers.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::core::session_store::SessionStore;
use crate::core::traits::{AccountService, MovementRequest, TransferRequest};
use crate::core::validation::{
    validate_deposit, validate_transfer, validate_withdrawal, AmountForm, TransferForm,
};
use crate::types::{
    AccountId, AccountSnapshot, AuthToken, BankingError, TransactionResult, ValidationErrors,
};

/// Which money movement an operation is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Deposit,
    Withdraw,
    Transfer,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Deposit => "deposit",
            OperationKind::Withdraw => "withdrawal",
            OperationKind::Transfer => "transfer",
        })
    }
}

/// A validated operation that has not been submitted yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingOperation {
    Deposit {
        amount: Decimal,
        description: String,
    },
    Withdraw {
        amount: Decimal,
        description: String,
    },
    Transfer {
        from_account_number: String,
        to_account_number: String,
        amount: Decimal,
        description: String,
        /// Balance at the time the transfer was validated
        current_balance: Decimal,
        /// `current_balance - amount`, shown for review only
        projected_balance: Decimal,
    },
}

impl PendingOperation {
    pub fn kind(&self) -> OperationKind {
        match self {
            PendingOperation::Deposit { .. } => OperationKind::Deposit,
            PendingOperation::Withdraw { .. } => OperationKind::Withdraw,
            PendingOperation::Transfer { .. } => OperationKind::Transfer,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            PendingOperation::Deposit { amount, .. }
            | PendingOperation::Withdraw { amount, .. }
            | PendingOperation::Transfer { amount, .. } => *amount,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            PendingOperation::Deposit { description, .. }
            | PendingOperation::Withdraw { description, .. }
            | PendingOperation::Transfer { description, .. } => description,
        }
    }

    /// Advisory post-transfer balance; `None` for deposits and withdrawals
    pub fn projected_balance(&self) -> Option<Decimal> {
        match self {
            PendingOperation::Transfer {
                projected_balance, ..
            } => Some(*projected_balance),
            _ => None,
        }
    }
}

/// Observable orchestrator state
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorState {
    /// Ready for a new operation
    Idle,

    /// The last form failed validation; nothing was sent
    Invalid(ValidationErrors),

    /// A transfer is waiting for the user to confirm or cancel
    AwaitingConfirmation(PendingOperation),

    /// One mutation is in flight
    Submitting(OperationKind),

    /// The last submission failed; cleared by `acknowledge` or a new operation
    Failed(BankingError),
}

#[derive(Debug)]
struct Inner {
    state: OrchestratorState,
    last_result: Option<TransactionResult>,
}

/// Message recorded when a submission is abandoned before the server answers
const INTERRUPTED: &str = "Submission interrupted; refresh to see its outcome";

/// An operation that has entered `Submitting`, ready to be sent
struct Submission<'a> {
    token: AuthToken,
    account_id: AccountId,
    pending: PendingOperation,
    guard: SubmittingGuard<'a>,
}

/// Owns the `Submitting` state of one in-flight mutation
///
/// Dropped without `finish` (the submitting future was cancelled), it moves
/// the orchestrator to `Failed` so the busy guard is released.
struct SubmittingGuard<'a> {
    inner: &'a Mutex<Inner>,
    kind: OperationKind,
    finished: bool,
}

impl<'a> SubmittingGuard<'a> {
    fn armed(inner: &'a Mutex<Inner>, kind: OperationKind) -> Self {
        SubmittingGuard {
            inner,
            kind,
            finished: false,
        }
    }

    fn finish(mut self, state: OrchestratorState, result: Option<TransactionResult>) {
        let mut inner = lock_inner(self.inner);
        // a failure keeps the last successful result
        if !matches!(state, OrchestratorState::Failed(_)) {
            inner.last_result = result;
        }
        inner.state = state;
        self.finished = true;
    }
}

impl Drop for SubmittingGuard<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        warn!(kind = %self.kind, "Submission dropped before the server answered");
        let mut inner = lock_inner(self.inner);
        if matches!(inner.state, OrchestratorState::Submitting(_)) {
            inner.state = OrchestratorState::Failed(BankingError::network(INTERRUPTED));
        }
    }
}

fn lock_inner(inner: &Mutex<Inner>) -> MutexGuard<'_, Inner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives money movements against the account service
pub struct TransactionOrchestrator {
    session: Arc<SessionStore>,
    service: Arc<dyn AccountService>,
    inner: Mutex<Inner>,
}

impl TransactionOrchestrator {
    pub fn new(session: Arc<SessionStore>, service: Arc<dyn AccountService>) -> Self {
        TransactionOrchestrator {
            session,
            service,
            inner: Mutex::new(Inner {
                state: OrchestratorState::Idle,
                last_result: None,
            }),
        }
    }

    /// Validate and submit a deposit
    ///
    /// # Errors
    ///
    /// `Busy` while another mutation is in flight, `NotSignedIn` without a
    /// session, `Validation` for a bad form (no request sent), or the
    /// service's error if the submission fails. `BalanceUnavailable` means the
    /// deposit was applied but the new balance could not be read back.
    ///
    /// Dropping the returned future mid-flight moves the orchestrator to
    /// `Failed` without touching the snapshot; the server may still apply it.
    pub async fn deposit(&self, form: &AmountForm) -> Result<TransactionResult, BankingError> {
        let submission = self.begin(|_| {
            let validated = validate_deposit(form)?;
            Ok(PendingOperation::Deposit {
                amount: validated.amount,
                description: validated.description,
            })
        })?;
        self.submit(submission).await
    }

    /// Validate against the cached balance and submit a withdrawal
    ///
    /// # Errors
    ///
    /// Same as [`TransactionOrchestrator::deposit`]; an amount above the cached
    /// balance is a `Validation` error and nothing is sent.
    pub async fn withdraw(&self, form: &AmountForm) -> Result<TransactionResult, BankingError> {
        let submission = self.begin(|snapshot| {
            let validated = validate_withdrawal(form, snapshot)?;
            Ok(PendingOperation::Withdraw {
                amount: validated.amount,
                description: validated.description,
            })
        })?;
        self.submit(submission).await
    }

    /// Validate a transfer and hold it for confirmation
    ///
    /// Returns the pending transfer with its projected balance. Nothing is sent
    /// until [`TransactionOrchestrator::confirm_transfer`].
    ///
    /// # Errors
    ///
    /// `Busy`, `NotSignedIn` or `Validation`.
    pub fn request_transfer(&self, form: &TransferForm) -> Result<PendingOperation, BankingError> {
        let mut inner = self.lock();
        Self::ensure_not_submitting(&inner)?;
        let (_, snapshot) = self.session.require_session()?;

        let pending = match validate_transfer(form, &snapshot) {
            Ok(validated) => PendingOperation::Transfer {
                from_account_number: snapshot.account_number.clone(),
                to_account_number: validated.to_account_number,
                amount: validated.amount,
                description: validated.description,
                current_balance: snapshot.balance,
                projected_balance: snapshot.balance - validated.amount,
            },
            Err(errors) => return Err(Self::reject(&mut inner, errors)),
        };

        debug!(
            amount = %pending.amount(),
            projected_balance = ?pending.projected_balance(),
            "Transfer awaiting confirmation"
        );
        inner.state = OrchestratorState::AwaitingConfirmation(pending.clone());
        Ok(pending)
    }

    /// Discard the pending transfer without contacting the server
    ///
    /// # Errors
    ///
    /// `Busy` once the transfer has been submitted, `NothingToConfirm` if no
    /// transfer is pending.
    pub fn cancel_transfer(&self) -> Result<(), BankingError> {
        let mut inner = self.lock();
        match inner.state {
            OrchestratorState::AwaitingConfirmation(_) => {
                inner.state = OrchestratorState::Idle;
                debug!("Transfer cancelled");
                Ok(())
            }
            OrchestratorState::Submitting(_) => Err(BankingError::Busy),
            _ => Err(BankingError::NothingToConfirm),
        }
    }

    /// Submit the pending transfer
    ///
    /// # Errors
    ///
    /// `Busy` when a submission is already in flight, `NothingToConfirm` when no
    /// transfer is pending, or the service's error.
    pub async fn confirm_transfer(&self) -> Result<TransactionResult, BankingError> {
        let submission = {
            let mut inner = self.lock();
            Self::ensure_not_submitting(&inner)?;
            if !matches!(inner.state, OrchestratorState::AwaitingConfirmation(_)) {
                return Err(BankingError::NothingToConfirm);
            }
            let (token, snapshot) = match self.session.require_session() {
                Ok(session) => session,
                Err(e) => {
                    inner.state = OrchestratorState::Idle;
                    return Err(e);
                }
            };
            let previous = std::mem::replace(
                &mut inner.state,
                OrchestratorState::Submitting(OperationKind::Transfer),
            );
            match previous {
                OrchestratorState::AwaitingConfirmation(pending) => Submission {
                    token,
                    account_id: snapshot.id,
                    pending,
                    guard: SubmittingGuard::armed(&self.inner, OperationKind::Transfer),
                },
                other => {
                    inner.state = other;
                    return Err(BankingError::NothingToConfirm);
                }
            }
        };
        self.submit(submission).await
    }

    /// Return to `Idle` after a failure or invalid form, dropping any result
    pub fn acknowledge(&self) {
        let mut inner = self.lock();
        if matches!(
            inner.state,
            OrchestratorState::Failed(_) | OrchestratorState::Invalid(_)
        ) {
            inner.state = OrchestratorState::Idle;
        }
        inner.last_result = None;
    }

    pub fn state(&self) -> OrchestratorState {
        self.lock().state.clone()
    }

    /// Whether a mutation is in flight
    pub fn is_busy(&self) -> bool {
        matches!(self.lock().state, OrchestratorState::Submitting(_))
    }

    /// Outcome of the most recent successful submission
    pub fn last_result(&self) -> Option<TransactionResult> {
        self.lock().last_result.clone()
    }

    /// Check the busy guard, validate, and enter `Submitting` in one step
    ///
    /// The guard check and the transition happen under one lock so two
    /// overlapping calls cannot both pass.
    fn begin<F>(&self, build: F) -> Result<Submission<'_>, BankingError>
    where
        F: FnOnce(&AccountSnapshot) -> Result<PendingOperation, ValidationErrors>,
    {
        let mut inner = self.lock();
        Self::ensure_not_submitting(&inner)?;
        let (token, snapshot) = self.session.require_session()?;

        let pending = match build(&snapshot) {
            Ok(pending) => pending,
            Err(errors) => return Err(Self::reject(&mut inner, errors)),
        };

        if let OrchestratorState::AwaitingConfirmation(_) = inner.state {
            debug!("Discarding pending transfer for a new operation");
        }
        inner.state = OrchestratorState::Submitting(pending.kind());
        Ok(Submission {
            token,
            account_id: snapshot.id,
            guard: SubmittingGuard::armed(&self.inner, pending.kind()),
            pending,
        })
    }

    async fn submit(&self, submission: Submission<'_>) -> Result<TransactionResult, BankingError> {
        let Submission {
            token,
            account_id,
            pending,
            guard,
        } = submission;
        let kind = pending.kind();
        let amount = pending.amount();
        debug!(%kind, %amount, "Submitting");

        let outcome = match pending {
            PendingOperation::Deposit { amount, description } => {
                let request = MovementRequest {
                    account_id,
                    amount,
                    description,
                };
                self.service.deposit(&token, &request).await
            }
            PendingOperation::Withdraw { amount, description } => {
                let request = MovementRequest {
                    account_id,
                    amount,
                    description,
                };
                self.service.withdraw(&token, &request).await
            }
            PendingOperation::Transfer {
                to_account_number,
                amount,
                description,
                ..
            } => {
                let request = TransferRequest {
                    from_account_id: account_id,
                    to_account_number,
                    amount,
                    description,
                };
                self.service.transfer(&token, &request).await
            }
        };

        match outcome {
            Ok(result) => {
                if !self.session.replace_snapshot(result.account.clone()) {
                    warn!(
                        %kind,
                        transaction_id = result.transaction_id,
                        "Transaction completed after sign-out; balance not reconciled"
                    );
                }
                info!(
                    %kind,
                    %amount,
                    transaction_id = result.transaction_id,
                    balance = %result.account.balance,
                    "Transaction completed"
                );
                guard.finish(OrchestratorState::Idle, Some(result.clone()));
                Ok(result)
            }
            Err(e) if e.is_committed() => {
                warn!(%kind, %amount, error = %e, "Transaction completed, balance not refreshed");
                guard.finish(OrchestratorState::Idle, None);
                Err(e)
            }
            Err(e) => {
                warn!(%kind, %amount, error = %e, "Transaction failed");
                guard.finish(OrchestratorState::Failed(e.clone()), None);
                Err(e)
            }
        }
    }

    fn ensure_not_submitting(inner: &Inner) -> Result<(), BankingError> {
        if let OrchestratorState::Submitting(kind) = inner.state {
            warn!(in_flight = %kind, "Rejecting submission while another is in flight");
            return Err(BankingError::Busy);
        }
        Ok(())
    }

    fn reject(inner: &mut Inner, errors: ValidationErrors) -> BankingError {
        debug!(%errors, "Form rejected");
        inner.state = OrchestratorState::Invalid(errors.clone());
        BankingError::Validation(errors)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        lock_inner(&self.inner)
    }
}

impl fmt::Debug for TransactionOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransactionOrchestrator")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::testing::FakeAccountService;
    use crate::core::traits::SessionStorage;
    use crate::io::MemorySessionStorage;
    use rstest::rstest;
    use std::time::Duration;

    fn setup(
        balance: Decimal,
    ) -> (Arc<FakeAccountService>, Arc<SessionStore>, TransactionOrchestrator) {
        let fake = Arc::new(FakeAccountService::with_balance(balance));
        let storage = MemorySessionStorage::new();
        storage.save(&fake.persisted_session()).unwrap();
        let session = Arc::new(SessionStore::open(fake.clone(), Box::new(storage)));
        let orchestrator = TransactionOrchestrator::new(session.clone(), fake.clone());
        (fake, session, orchestrator)
    }

    fn cached_balance(session: &SessionStore) -> Decimal {
        session.snapshot().unwrap().balance
    }

    #[tokio::test]
    async fn test_deposit_takes_balance_from_server() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        // $0.50 fee: a locally computed $150.00 would not match
        fake.script_next_balance(Decimal::new(14950, 2));

        let result = orchestrator
            .deposit(&AmountForm::new("50", ""))
            .await
            .unwrap();

        assert_eq!(result.account.balance, Decimal::new(14950, 2));
        assert_eq!(cached_balance(&session), Decimal::new(14950, 2));
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
        assert_eq!(orchestrator.last_result(), Some(result));
    }

    #[rstest]
    #[case::deposit_small(OperationKind::Deposit, "0.01", Decimal::new(7, 0))]
    #[case::deposit_large(OperationKind::Deposit, "2500", Decimal::new(3, 0))]
    #[case::withdraw_part(OperationKind::Withdraw, "40", Decimal::new(123456, 2))]
    #[case::withdraw_all(OperationKind::Withdraw, "100", Decimal::new(1, 0))]
    #[tokio::test]
    async fn test_cached_balance_is_always_server_balance(
        #[case] kind: OperationKind,
        #[case] amount: &str,
        #[case] server_balance: Decimal,
    ) {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        fake.script_next_balance(server_balance);

        let form = AmountForm::new(amount, "");
        match kind {
            OperationKind::Deposit => orchestrator.deposit(&form).await.unwrap(),
            _ => orchestrator.withdraw(&form).await.unwrap(),
        };

        assert_eq!(cached_balance(&session), server_balance);
    }

    #[tokio::test]
    async fn test_withdraw_over_balance_makes_no_call() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));

        let err = orchestrator
            .withdraw(&AmountForm::new("150", ""))
            .await
            .unwrap_err();

        let errors = err.validation_errors().unwrap();
        assert_eq!(errors.to_string().to_lowercase(), "insufficient balance");
        assert!(matches!(orchestrator.state(), OrchestratorState::Invalid(_)));
        assert_eq!(fake.calls().mutations(), 0);
        assert_eq!(cached_balance(&session), Decimal::new(10000, 2));
    }

    #[tokio::test]
    async fn test_second_submission_while_busy_is_rejected() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        let gate = fake.gate_mutations();

        let form = AmountForm::new("10", "");
        let first = orchestrator.deposit(&form);
        let second = async {
            // Runs once `first` is parked on the gated server call
            tokio::task::yield_now().await;
            assert!(orchestrator.is_busy());
            let rejected = orchestrator.withdraw(&form).await;
            let rejected_again = orchestrator.deposit(&form).await;
            gate.notify_one();
            (rejected, rejected_again)
        };

        let (first, (rejected, rejected_again)) = futures::join!(first, second);

        assert!(first.is_ok());
        assert_eq!(rejected.unwrap_err(), BankingError::Busy);
        assert_eq!(rejected_again.unwrap_err(), BankingError::Busy);
        let calls = fake.calls();
        assert_eq!(calls.deposit, 1);
        assert_eq!(calls.withdraw, 0);
        assert_eq!(cached_balance(&session), Decimal::new(11000, 2));
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_transfer_cancel_makes_no_call() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));

        let pending = orchestrator
            .request_transfer(&TransferForm::new("ACC-000042", "20", ""))
            .unwrap();
        assert_eq!(pending.projected_balance(), Some(Decimal::new(8000, 2)));
        assert!(matches!(
            orchestrator.state(),
            OrchestratorState::AwaitingConfirmation(_)
        ));
        // projection is never written into the snapshot
        assert_eq!(cached_balance(&session), Decimal::new(10000, 2));

        orchestrator.cancel_transfer().unwrap();
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
        assert_eq!(cached_balance(&session), Decimal::new(10000, 2));
        assert_eq!(fake.calls().transfer, 0);
        assert_eq!(
            orchestrator.confirm_transfer().await.unwrap_err(),
            BankingError::NothingToConfirm
        );
    }

    #[tokio::test]
    async fn test_transfer_confirm_uses_server_balance() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        fake.set_counterparty_name("Grace Hopper");
        fake.script_next_balance(Decimal::new(7975, 2));

        orchestrator
            .request_transfer(&TransferForm::new("acc-000042", "20", "Dinner"))
            .unwrap();
        let result = orchestrator.confirm_transfer().await.unwrap();

        assert_eq!(cached_balance(&session), Decimal::new(7975, 2));
        let counterparty = result.counterparty.unwrap();
        assert_eq!(counterparty.account_number, "ACC-000042");
        assert_eq!(counterparty.name.as_deref(), Some("Grace Hopper"));
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
    }

    #[tokio::test]
    async fn test_double_confirm_sends_one_transfer() {
        let (fake, _session, orchestrator) = setup(Decimal::new(10000, 2));
        let gate = fake.gate_mutations();
        orchestrator
            .request_transfer(&TransferForm::new("ACC-000042", "20", ""))
            .unwrap();

        let first = orchestrator.confirm_transfer();
        let second = async {
            tokio::task::yield_now().await;
            let second = orchestrator.confirm_transfer().await;
            let cancel = orchestrator.cancel_transfer();
            gate.notify_one();
            (second, cancel)
        };
        let (first, (second, cancel)) = futures::join!(first, second);

        assert!(first.is_ok());
        assert_eq!(second.unwrap_err(), BankingError::Busy);
        assert_eq!(cancel.unwrap_err(), BankingError::Busy);
        assert_eq!(fake.calls().transfer, 1);
    }

    #[tokio::test]
    async fn test_failed_submission_leaves_snapshot() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        fake.fail_next_mutation(BankingError::server(400, "Daily limit exceeded"));

        let err = orchestrator
            .withdraw(&AmountForm::new("30", ""))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Daily limit exceeded");
        assert_eq!(
            orchestrator.state(),
            OrchestratorState::Failed(BankingError::server(400, "Daily limit exceeded"))
        );
        assert_eq!(cached_balance(&session), Decimal::new(10000, 2));

        orchestrator.acknowledge();
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
        assert_eq!(orchestrator.last_result(), None);
    }

    #[tokio::test]
    async fn test_failed_transfer_discards_pending() {
        let (fake, _session, orchestrator) = setup(Decimal::new(10000, 2));
        fake.fail_next_mutation(BankingError::server(404, "Destination account not found"));

        orchestrator
            .request_transfer(&TransferForm::new("ACC-999999", "20", ""))
            .unwrap();
        assert!(orchestrator.confirm_transfer().await.is_err());

        orchestrator.acknowledge();
        assert_eq!(
            orchestrator.confirm_transfer().await.unwrap_err(),
            BankingError::NothingToConfirm
        );
        assert_eq!(fake.calls().transfer, 1);
    }

    #[tokio::test]
    async fn test_server_may_reject_after_local_check_passes() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        // another session drained the account since our last refresh
        fake.set_server_balance(Decimal::new(500, 2));

        let err = orchestrator
            .withdraw(&AmountForm::new("50", ""))
            .await
            .unwrap_err();

        assert_eq!(err, BankingError::server(400, "Insufficient funds"));
        assert_eq!(cached_balance(&session), Decimal::new(10000, 2));
    }

    #[rstest]
    #[case::own_account("ACC-000001", "10")]
    #[case::own_account_zero("ACC-000001", "0")]
    #[case::missing_destination("", "10")]
    #[case::over_balance("ACC-000042", "100.01")]
    fn test_invalid_transfer_never_awaits_confirmation(#[case] to: &str, #[case] amount: &str) {
        let (fake, _session, orchestrator) = setup(Decimal::new(10000, 2));

        let err = orchestrator
            .request_transfer(&TransferForm::new(to, amount, ""))
            .unwrap_err();

        assert!(matches!(err, BankingError::Validation(_)));
        assert!(matches!(orchestrator.state(), OrchestratorState::Invalid(_)));
        assert_eq!(fake.calls().transfer, 0);
    }

    #[tokio::test]
    async fn test_signed_out_orchestrator_sends_nothing() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        session.sign_out();

        let err = orchestrator
            .deposit(&AmountForm::new("10", ""))
            .await
            .unwrap_err();
        assert_eq!(err, BankingError::NotSignedIn);
        assert_eq!(fake.calls().mutations(), 0);
    }

    #[tokio::test]
    async fn test_dropped_submission_releases_busy_guard() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        let gate = fake.gate_mutations();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            orchestrator.deposit(&AmountForm::new("10", "")),
        )
        .await;

        assert!(abandoned.is_err());
        assert!(!orchestrator.is_busy());
        assert_eq!(
            orchestrator.state(),
            OrchestratorState::Failed(BankingError::network(INTERRUPTED))
        );
        assert_eq!(cached_balance(&session), Decimal::new(10000, 2));

        gate.notify_one();
        let result = orchestrator.withdraw(&AmountForm::new("1", "")).await;
        assert!(result.is_ok());
        assert_eq!(fake.calls().mutations(), 2);
    }

    #[tokio::test]
    async fn test_dropped_confirm_releases_busy_guard() {
        let (fake, _session, orchestrator) = setup(Decimal::new(10000, 2));
        orchestrator
            .request_transfer(&TransferForm::new("ACC-000042", "20", ""))
            .unwrap();
        let _gate = fake.gate_mutations();

        let abandoned =
            tokio::time::timeout(Duration::from_millis(50), orchestrator.confirm_transfer()).await;

        assert!(abandoned.is_err());
        assert!(!orchestrator.is_busy());
        assert_eq!(
            orchestrator.cancel_transfer().unwrap_err(),
            BankingError::NothingToConfirm
        );
        assert_eq!(fake.calls().transfer, 1);
    }

    #[tokio::test]
    async fn test_committed_transaction_without_balance_is_not_a_failure() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        fake.fail_next_refresh(BankingError::network("The request timed out. Please try again."));

        let err = orchestrator
            .deposit(&AmountForm::new("50", ""))
            .await
            .unwrap_err();

        assert!(err.is_committed());
        assert!(matches!(
            err,
            BankingError::BalanceUnavailable { transaction_id: 1, .. }
        ));
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
        assert_eq!(orchestrator.last_result(), None);
        // the cached snapshot waits for the next server read
        assert_eq!(cached_balance(&session), Decimal::new(10000, 2));
        assert_eq!(fake.server_balance(), Decimal::new(15000, 2));
    }

    #[tokio::test]
    async fn test_completion_after_sign_out_is_not_reconciled() {
        let (fake, session, orchestrator) = setup(Decimal::new(10000, 2));
        let gate = fake.gate_mutations();

        let form = AmountForm::new("10", "");
        let submit = orchestrator.deposit(&form);
        let sign_out = async {
            tokio::task::yield_now().await;
            session.sign_out();
            gate.notify_one();
        };
        let (result, ()) = futures::join!(submit, sign_out);

        assert!(result.is_ok());
        assert_eq!(session.snapshot(), None);
        assert_eq!(orchestrator.state(), OrchestratorState::Idle);
    }
}
