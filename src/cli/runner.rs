//! Command execution
//!
//! Maps each parsed [`Command`] onto the client and renders the outcome as
//! plain text. Input (password and confirmation prompts) and output are passed
//! in so the same code runs against stdin/stdout or in-memory buffers.

use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

use crate::cli::args::Command;
use crate::client::BankingClient;
use crate::core::dashboard::DashboardView;
use crate::core::orchestrator::PendingOperation;
use crate::core::validation::{AmountForm, TransferForm};
use crate::io::{format_currency, format_date, format_transaction_amount, truncate};
use crate::types::{
    BankingError, Credentials, Registration, Transaction, TransactionKind, TransactionResult,
};

/// Failure while running a command
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Banking(#[from] BankingError),

    #[error("Cannot write output: {0}")]
    Io(#[from] std::io::Error),
}

const DESCRIPTION_WIDTH: usize = 30;

/// Run one command against `client`
///
/// # Arguments
///
/// * `client` - Client holding the session
/// * `command` - Parsed command
/// * `input` - Source for password and confirmation prompts
/// * `output` - Destination for command output
///
/// # Errors
///
/// Returns the client error for the command, or `Io` if output cannot be written.
pub async fn execute<R, W>(
    client: &BankingClient,
    command: Command,
    input: &mut R,
    output: &mut W,
) -> Result<(), CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    match command {
        Command::Login { email, password } => {
            let password = match password {
                Some(password) => password,
                None => prompt(input, output, "Password: ").await?,
            };
            let (identity, snapshot) = client
                .session()
                .sign_in(&Credentials::new(email, password))
                .await?;
            let text = format!(
                "Signed in as {} <{}>\nAccount {}: {}\n",
                identity.name,
                identity.email,
                snapshot.account_number,
                format_currency(snapshot.balance)
            );
            write(output, &text).await
        }
        Command::Register {
            name,
            email,
            password,
            confirm_password,
            initial_deposit,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt(input, output, "Password: ").await?,
            };
            let registration = Registration {
                name,
                email,
                confirm_password: confirm_password.unwrap_or_else(|| password.clone()),
                password,
                initial_deposit,
            };
            let (identity, snapshot) = client.session().sign_up(&registration).await?;
            let text = format!(
                "Welcome, {}! Account {} opened with {}\n",
                identity.name,
                snapshot.account_number,
                format_currency(snapshot.balance)
            );
            write(output, &text).await
        }
        Command::Logout => {
            client.session().sign_out();
            write(output, "Signed out\n").await
        }
        Command::Whoami => {
            let view = client.session().view();
            let text = match (view.identity, view.snapshot) {
                (Some(identity), Some(snapshot)) if view.authenticated => format!(
                    "{} <{}>\nAccount {}: {} (last known)\n",
                    identity.name,
                    identity.email,
                    snapshot.account_number,
                    format_currency(snapshot.balance)
                ),
                (Some(identity), None) if view.authenticated => {
                    format!("{} <{}>\n", identity.name, identity.email)
                }
                _ => "Not signed in\n".to_string(),
            };
            write(output, &text).await
        }
        Command::Dashboard => {
            let view = client.dashboard().load().await?;
            write(output, &render_dashboard(&view, client.config().stats_window_days)).await
        }
        Command::History { pages } => {
            let (_, snapshot) = client.session().require_session()?;
            let page_size = client.config().history_page_size;
            let mut history = client.history();
            history.load_first_page(snapshot.id, page_size).await?;
            for _ in 1..pages.max(1) {
                if !history.has_more() {
                    break;
                }
                history.load_next_page(snapshot.id, page_size).await?;
            }

            let mut text = String::new();
            if history.is_empty() {
                text.push_str("No transactions yet\n");
            }
            for transaction in history.transactions() {
                text.push_str(&render_transaction(transaction));
                text.push('\n');
            }
            if history.has_more() {
                text.push_str("More transactions available (use --pages to load more)\n");
            }
            write(output, &text).await
        }
        Command::Deposit {
            amount,
            description,
        } => {
            let outcome = client
                .orchestrator()
                .deposit(&AmountForm::new(amount, description))
                .await;
            report(output, "Deposit", outcome).await
        }
        Command::Withdraw {
            amount,
            description,
        } => {
            let outcome = client
                .orchestrator()
                .withdraw(&AmountForm::new(amount, description))
                .await;
            report(output, "Withdrawal", outcome).await
        }
        Command::Transfer {
            to,
            amount,
            description,
            yes,
        } => {
            let orchestrator = client.orchestrator();
            let form = TransferForm::new(to, amount, description);
            let pending = orchestrator.request_transfer(&form)?;
            write(output, &render_review(&pending)).await?;

            if !yes {
                let answer = prompt(input, output, "Confirm transfer? [y/N] ").await?;
                if !matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes") {
                    orchestrator.cancel_transfer()?;
                    return write(output, "Transfer cancelled\n").await;
                }
            }

            let outcome = orchestrator.confirm_transfer().await;
            report(output, "Transfer", outcome).await
        }
    }
}

async fn write<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> Result<(), CliError> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await?;
    Ok(())
}

/// Write the outcome of a submitted money movement
///
/// A committed transaction whose balance could not be re-read is reported as
/// completed, not as an error.
async fn report<W: AsyncWrite + Unpin>(
    output: &mut W,
    label: &str,
    outcome: Result<TransactionResult, BankingError>,
) -> Result<(), CliError> {
    match outcome {
        Ok(result) => write(output, &render_result(label, &result)).await,
        Err(e) if e.is_committed() => write(output, &format!("{e}\n")).await,
        Err(e) => Err(e.into()),
    }
}

async fn prompt<R, W>(input: &mut R, output: &mut W, label: &str) -> Result<String, CliError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    write(output, label).await?;
    let mut line = String::new();
    input.read_line(&mut line).await?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn render_review(pending: &PendingOperation) -> String {
    match pending {
        PendingOperation::Transfer {
            from_account_number,
            to_account_number,
            amount,
            description,
            current_balance,
            projected_balance,
        } => {
            let mut text = format!(
                "Transfer {} from {} to {}\n",
                format_currency(*amount),
                from_account_number,
                to_account_number
            );
            if !description.is_empty() {
                text.push_str(&format!("Description: {description}\n"));
            }
            text.push_str(&format!(
                "Current balance: {}\nBalance after transfer: {} (estimate)\n",
                format_currency(*current_balance),
                format_currency(*projected_balance)
            ));
            text
        }
        other => format!(
            "{} of {}\n",
            other.kind(),
            format_currency(other.amount())
        ),
    }
}

fn render_result(label: &str, result: &TransactionResult) -> String {
    let mut text = match &result.counterparty {
        Some(counterparty) => {
            let recipient = match &counterparty.name {
                Some(name) => format!("{} ({})", counterparty.account_number, name),
                None => counterparty.account_number.clone(),
            };
            format!(
                "{label} of {} to {recipient} completed\n",
                format_currency(counterparty.amount)
            )
        }
        None => format!("{label} completed\n"),
    };
    text.push_str(&format!(
        "New balance: {} (transaction #{})\n",
        format_currency(result.account.balance),
        result.transaction_id
    ));
    text
}

fn render_transaction(transaction: &Transaction) -> String {
    let kind = match transaction.kind() {
        TransactionKind::Deposit => "Deposit",
        TransactionKind::Withdrawal => "Withdrawal",
        TransactionKind::TransferIn => "Transfer in",
        TransactionKind::TransferOut => "Transfer out",
    };
    let description = transaction
        .description
        .as_deref()
        .or(transaction.counterparty_account_number.as_deref())
        .unwrap_or("");
    format!(
        "{:<16} {:<12} {:>14}  {:<width$}  balance {}",
        format_date(&transaction.created_at),
        kind,
        format_transaction_amount(transaction.amount, transaction.tx_type),
        truncate(description, DESCRIPTION_WIDTH),
        format_currency(transaction.balance_after),
        width = DESCRIPTION_WIDTH + 3
    )
}

fn render_dashboard(view: &DashboardView, stats_window_days: u32) -> String {
    let mut text = format!(
        "Account {}\nBalance: {}\n\n",
        view.account.account_number,
        format_currency(view.account.balance)
    );

    text.push_str(&format!("Last {stats_window_days} days\n"));
    text.push_str(&format!(
        "  Income:       {}\n  Expenses:     {}\n  Transactions: {}\n\n",
        format_currency(view.stats.total_income),
        format_currency(view.stats.total_expenses),
        view.stats.total_transactions
    ));

    text.push_str("Recent transactions\n");
    if view.recent.is_empty() {
        text.push_str("  none\n");
    }
    for transaction in &view.recent {
        text.push_str("  ");
        text.push_str(&render_transaction(transaction));
        text.push('\n');
    }

    for degraded in &view.degraded {
        text.push_str(&format!(
            "\n({} unavailable: {})\n",
            degraded.panel, degraded.error
        ));
    }
    text
}
