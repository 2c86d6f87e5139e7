//! Local form validation
//!
//! Pure, synchronous checks that run before anything is sent. Each validator
//! collects every field problem it finds rather than stopping at the first one,
//! so a form can show all of its messages at once.
//!
//! The balance checks here are a convenience only. The server performs the
//! authoritative check and may still reject a request that passed.

use rust_decimal::Decimal;
use std::str::FromStr;

use crate::core::traits::RegistrationRequest;
use crate::types::{
    AccountSnapshot, Credentials, Field, FieldErrorKind, Registration, ValidationErrors,
};

const MIN_NAME_CHARS: usize = 2;
const MIN_PASSWORD_CHARS: usize = 6;
const MAX_PASSWORD_CHARS: usize = 72;

/// Deposit or withdrawal form input, exactly as typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AmountForm {
    pub amount: String,
    pub description: String,
}

impl AmountForm {
    pub fn new(amount: impl Into<String>, description: impl Into<String>) -> Self {
        AmountForm {
            amount: amount.into(),
            description: description.into(),
        }
    }
}

/// Transfer form input, exactly as typed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferForm {
    pub to_account_number: String,
    pub amount: String,
    pub description: String,
}

impl TransferForm {
    pub fn new(
        to_account_number: impl Into<String>,
        amount: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        TransferForm {
            to_account_number: to_account_number.into(),
            amount: amount.into(),
            description: description.into(),
        }
    }
}

/// A deposit or withdrawal that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedMovement {
    pub amount: Decimal,
    pub description: String,
}

/// A transfer that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedTransfer {
    /// Normalized to upper case, as account numbers are issued
    pub to_account_number: String,
    pub amount: Decimal,
    pub description: String,
}

/// Parse a typed amount as a strictly positive decimal
///
/// Accepts an optional leading `$` and surrounding whitespace.
pub fn parse_positive_amount(raw: &str) -> Result<Decimal, FieldErrorKind> {
    let amount = parse_amount(raw)?;
    if amount <= Decimal::ZERO {
        return Err(FieldErrorKind::NonPositive);
    }
    Ok(amount)
}

fn parse_amount(raw: &str) -> Result<Decimal, FieldErrorKind> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_prefix('$').unwrap_or(trimmed).trim();
    if trimmed.is_empty() {
        return Err(FieldErrorKind::Required);
    }
    Decimal::from_str(trimmed).map_err(|_| FieldErrorKind::NotANumber)
}

/// Validate a deposit form
pub fn validate_deposit(form: &AmountForm) -> Result<ValidatedMovement, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let amount = match parse_positive_amount(&form.amount) {
        Ok(amount) => amount,
        Err(kind) => {
            errors.add(Field::Amount, kind);
            Decimal::ZERO
        }
    };

    errors.into_result(ValidatedMovement {
        amount,
        description: form.description.trim().to_string(),
    })
}

/// Validate a withdrawal form against the cached snapshot
pub fn validate_withdrawal(
    form: &AmountForm,
    snapshot: &AccountSnapshot,
) -> Result<ValidatedMovement, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let amount = check_debit_amount(&form.amount, snapshot, &mut errors);

    errors.into_result(ValidatedMovement {
        amount,
        description: form.description.trim().to_string(),
    })
}

/// Validate a transfer form against the cached snapshot
///
/// Rejects the sender's own account number for any amount.
pub fn validate_transfer(
    form: &TransferForm,
    snapshot: &AccountSnapshot,
) -> Result<ValidatedTransfer, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let to_account_number = form.to_account_number.trim().to_ascii_uppercase();
    if to_account_number.is_empty() {
        errors.add(Field::Destination, FieldErrorKind::Required);
    } else if snapshot.is_own_account_number(&to_account_number) {
        errors.add(Field::Destination, FieldErrorKind::OwnAccount);
    }

    let amount = check_debit_amount(&form.amount, snapshot, &mut errors);

    errors.into_result(ValidatedTransfer {
        to_account_number,
        amount,
        description: form.description.trim().to_string(),
    })
}

fn check_debit_amount(
    raw: &str,
    snapshot: &AccountSnapshot,
    errors: &mut ValidationErrors,
) -> Decimal {
    match parse_positive_amount(raw) {
        Ok(amount) if amount > snapshot.balance => {
            errors.add(
                Field::Amount,
                FieldErrorKind::InsufficientBalance {
                    available: snapshot.balance,
                    requested: amount,
                },
            );
            amount
        }
        Ok(amount) => amount,
        Err(kind) => {
            errors.add(Field::Amount, kind);
            Decimal::ZERO
        }
    }
}

/// Validate a sign-in form
pub fn validate_credentials(credentials: &Credentials) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_email(&credentials.email, &mut errors);
    if credentials.password.is_empty() {
        errors.add(Field::Password, FieldErrorKind::Required);
    }
    errors.into_result(())
}

/// Validate a sign-up form and build the request payload
///
/// The initial deposit may be zero but not negative.
pub fn validate_registration(
    registration: &Registration,
) -> Result<RegistrationRequest, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name = registration.name.trim();
    if name.chars().count() < MIN_NAME_CHARS {
        errors.add(Field::Name, FieldErrorKind::TooShort { min: MIN_NAME_CHARS });
    }

    check_email(&registration.email, &mut errors);

    let password_chars = registration.password.chars().count();
    if password_chars == 0 {
        errors.add(Field::Password, FieldErrorKind::Required);
    } else if password_chars < MIN_PASSWORD_CHARS {
        errors.add(
            Field::Password,
            FieldErrorKind::TooShort {
                min: MIN_PASSWORD_CHARS,
            },
        );
    } else if password_chars > MAX_PASSWORD_CHARS {
        errors.add(
            Field::Password,
            FieldErrorKind::TooLong {
                max: MAX_PASSWORD_CHARS,
            },
        );
    }

    if registration.password != registration.confirm_password {
        errors.add(Field::ConfirmPassword, FieldErrorKind::Mismatch);
    }

    let initial_deposit = match parse_amount(&registration.initial_deposit) {
        Ok(amount) if amount < Decimal::ZERO => {
            errors.add(Field::InitialDeposit, FieldErrorKind::Negative);
            Decimal::ZERO
        }
        Ok(amount) => amount,
        Err(kind) => {
            errors.add(Field::InitialDeposit, kind);
            Decimal::ZERO
        }
    };

    errors.into_result(RegistrationRequest {
        name: name.to_string(),
        email: registration.email.trim().to_string(),
        password: registration.password.clone(),
        initial_deposit,
    })
}

fn check_email(raw: &str, errors: &mut ValidationErrors) {
    let email = raw.trim();
    if email.is_empty() {
        errors.add(Field::Email, FieldErrorKind::Required);
    } else if !looks_like_email(email) {
        errors.add(Field::Email, FieldErrorKind::InvalidEmail);
    }
}

// Shape check only: something@something.something with no whitespace
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.rsplit_once('@') {
        Some((local, domain)) if !local.is_empty() => match domain.rsplit_once('.') {
            Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
            None => false,
        },
        _ => false,
    }
}
