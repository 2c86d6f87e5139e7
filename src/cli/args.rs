use crate::config::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_SESSION_PATH};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

/// Command-line client for a SecureBank account
#[derive(Parser, Debug)]
#[command(name = "securebank")]
#[command(
    about = "Sign in, check balances and move money on a SecureBank account",
    long_about = None
)]
pub struct CliArgs {
    /// API root of the banking server
    #[arg(
        long = "base-url",
        value_name = "URL",
        env = "SECUREBANK_API_URL",
        default_value = DEFAULT_BASE_URL,
        global = true
    )]
    pub base_url: String,

    /// Per-request timeout in seconds
    #[arg(long = "timeout-secs", value_name = "SECS", default_value_t = 30, global = true)]
    pub timeout_secs: u64,

    /// Where the signed-in session is kept between runs
    #[arg(
        long = "session-file",
        value_name = "PATH",
        env = "SECUREBANK_SESSION_FILE",
        default_value = DEFAULT_SESSION_PATH,
        global = true
    )]
    pub session_file: PathBuf,

    /// Transactions per history page (default: 20)
    #[arg(long = "page-size", value_name = "COUNT", global = true)]
    pub page_size: Option<u32>,

    #[command(subcommand)]
    pub command: Command,
}

/// Client commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Sign in and remember the session
    Login {
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
    },

    /// Create a user and account, then sign in
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        /// Prompted for when omitted
        #[arg(long)]
        password: Option<String>,
        /// Defaults to the password
        #[arg(long = "confirm-password")]
        confirm_password: Option<String>,
        #[arg(long = "initial-deposit", value_name = "AMOUNT", default_value = "0")]
        initial_deposit: String,
    },

    /// Forget the stored session
    Logout,

    /// Show the signed-in user and cached balance
    Whoami,

    /// Refresh the balance and show recent activity and statistics
    Dashboard,

    /// List transaction history, newest first
    History {
        /// Number of pages to load
        #[arg(long, default_value_t = 1)]
        pages: u32,
    },

    /// Deposit money into the account
    Deposit {
        amount: String,
        #[arg(long, short, default_value = "")]
        description: String,
    },

    /// Withdraw money from the account
    Withdraw {
        amount: String,
        #[arg(long, short, default_value = "")]
        description: String,
    },

    /// Transfer money to another account by account number
    Transfer {
        #[arg(value_name = "TO_ACCOUNT")]
        to: String,
        amount: String,
        #[arg(long, short, default_value = "")]
        description: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

impl CliArgs {
    /// Create a ClientConfig from CLI arguments
    ///
    /// Values not exposed on the command line keep their defaults. Zero values
    /// fall back to defaults with a warning.
    pub fn to_client_config(&self) -> ClientConfig {
        let default = ClientConfig::default();
        ClientConfig::new(
            self.base_url.clone(),
            Duration::from_secs(self.timeout_secs),
            self.page_size.unwrap_or(default.history_page_size),
            default.dashboard_page_size,
            default.stats_window_days,
            self.session_file.clone(),
        )
    }
}
