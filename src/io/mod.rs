//! I/O module
//!
//! Adapters between the core and the outside world.
//!
//! # Components
//!
//! - `http_client` - Remote account service over HTTP/JSON
//! - `session_file` - Durable (file) and in-memory session storage
//! - `format` - Display formatting for amounts, account numbers and dates

pub mod format;
pub mod http_client;
pub mod session_file;

pub use format::{
    format_account_number, format_currency, format_date, format_transaction_amount, truncate,
};
pub use http_client::HttpAccountService;
pub use session_file::{FileSessionStorage, MemorySessionStorage};
