//! Client configuration
//!
//! `ClientConfig` collects the server location, request timeout, page sizes and
//! where the session is persisted. Zero values are not meaningful for any of
//! the numeric settings and fall back to the defaults with a warning.

use std::path::PathBuf;
use std::time::Duration;

use tracing::warn;

/// Default API root
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Default session document location
pub const DEFAULT_SESSION_PATH: &str = "./.securebank/session.json";

/// Settings shared by the service adapter, paginator and dashboard
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// API root that endpoint paths are resolved against
    pub base_url: String,
    /// Per-request timeout
    pub request_timeout: Duration,
    /// Page size for the full history listing
    pub history_page_size: u32,
    /// Number of recent transactions on the dashboard
    pub dashboard_page_size: u32,
    /// Trailing window for dashboard statistics
    pub stats_window_days: u32,
    /// Persisted session file
    pub session_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout: Duration::from_secs(30),
            history_page_size: 20,
            dashboard_page_size: 10,
            stats_window_days: 30,
            session_path: PathBuf::from(DEFAULT_SESSION_PATH),
        }
    }
}

impl ClientConfig {
    /// Create a ClientConfig with custom values
    ///
    /// A blank `base_url`, a zero timeout, or a zero page size or window is
    /// replaced by its default and logged.
    pub fn new(
        base_url: impl Into<String>,
        request_timeout: Duration,
        history_page_size: u32,
        dashboard_page_size: u32,
        stats_window_days: u32,
        session_path: impl Into<PathBuf>,
    ) -> Self {
        let default = Self::default();

        let base_url = base_url.into();
        let base_url = if base_url.trim().is_empty() {
            warn!(default = %default.base_url, "Empty base_url, using default");
            default.base_url
        } else {
            base_url.trim().to_string()
        };

        let request_timeout = if request_timeout.is_zero() {
            warn!(
                default_secs = default.request_timeout.as_secs(),
                "Invalid request_timeout (0), using default"
            );
            default.request_timeout
        } else {
            request_timeout
        };

        Self {
            base_url,
            request_timeout,
            history_page_size: non_zero(
                "history_page_size",
                history_page_size,
                default.history_page_size,
            ),
            dashboard_page_size: non_zero(
                "dashboard_page_size",
                dashboard_page_size,
                default.dashboard_page_size,
            ),
            stats_window_days: non_zero(
                "stats_window_days",
                stats_window_days,
                default.stats_window_days,
            ),
            session_path: session_path.into(),
        }
    }
}

fn non_zero(name: &str, value: u32, default: u32) -> u32 {
    if value == 0 {
        warn!(setting = name, default, "Invalid value (0), using default");
        default
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/api/v1");
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(config.history_page_size, 20);
        assert_eq!(config.dashboard_page_size, 10);
        assert_eq!(config.stats_window_days, 30);
        assert_eq!(config.session_path, PathBuf::from("./.securebank/session.json"));
    }

    #[rstest]
    #[case::all_valid(
        " https://bank.test/api/v1 ",
        5,
        50,
        5,
        7,
        ("https://bank.test/api/v1", 5, 50, 5, 7)
    )]
    #[case::zero_history(DEFAULT_BASE_URL, 30, 0, 10, 30, (DEFAULT_BASE_URL, 30, 20, 10, 30))]
    #[case::zero_dashboard(DEFAULT_BASE_URL, 30, 20, 0, 30, (DEFAULT_BASE_URL, 30, 20, 10, 30))]
    #[case::zero_window(DEFAULT_BASE_URL, 30, 20, 10, 0, (DEFAULT_BASE_URL, 30, 20, 10, 30))]
    #[case::zero_timeout(DEFAULT_BASE_URL, 0, 20, 10, 30, (DEFAULT_BASE_URL, 30, 20, 10, 30))]
    #[case::blank_url("   ", 30, 20, 10, 30, (DEFAULT_BASE_URL, 30, 20, 10, 30))]
    fn test_new_sanitizes_values(
        #[case] base_url: &str,
        #[case] timeout_secs: u64,
        #[case] history: u32,
        #[case] dashboard: u32,
        #[case] days: u32,
        #[case] expected: (&str, u64, u32, u32, u32),
    ) {
        let config = ClientConfig::new(
            base_url,
            Duration::from_secs(timeout_secs),
            history,
            dashboard,
            days,
            "session.json",
        );

        assert_eq!(
            (
                config.base_url.as_str(),
                config.request_timeout.as_secs(),
                config.history_page_size,
                config.dashboard_page_size,
                config.stats_window_days,
            ),
            expected
        );
    }
}
