//! SecureBank CLI
//!
//! Command-line client for a SecureBank account.
//!
//! # Usage
//!
//! ```bash
//! securebank login --email ada@example.com
//! securebank dashboard
//! securebank deposit 50 --description "Paycheck"
//! securebank transfer ACC-000042 20
//! securebank --page-size 50 history --pages 3
//! securebank logout
//! ```
//!
//! The session is kept in `--session-file` between runs. Logs go to stderr and
//! are filtered with `RUST_LOG` (default `info`), so stdout carries only output.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (validation, rejected request, unreachable server, etc.)

use securebank_client::cli;
use securebank_client::BankingClient;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let args = cli::parse_args();
    let config = args.to_client_config();

    let client = match BankingClient::connect(config) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let mut input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut output = tokio::io::stdout();
    if let Err(e) = cli::execute(&client, args.command, &mut input, &mut output).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}
