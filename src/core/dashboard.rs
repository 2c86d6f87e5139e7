//! Dashboard aggregation
//!
//! `DashboardAggregator::load` fans out three reads at once and joins them:
//!
//! ```text
//!            ┌── fetch_account ──────────► snapshot   (required)
//! load() ────┼── history first page ─────► recent     (degrades to empty)
//!            └── fetch_stats(days) ──────► stats      (degrades to default)
//! ```
//!
//! The account read is authoritative: if it fails the whole load fails and can
//! simply be retried. History and statistics are supplementary, so a failure
//! there is recorded in [`DashboardView::degraded`] and the rest still renders.
//!
//! The refreshed snapshot goes through the session's stale-read guard. If a
//! mutation lands while the load is in flight, its result wins over the read.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::paginator::HistoryPaginator;
use crate::core::session_store::SessionStore;
use crate::core::traits::AccountService;
use crate::types::{AccountSnapshot, BankingError, DashboardStats, Transaction};

/// Supplementary dashboard panel that can fail on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    History,
    Stats,
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Panel::History => "recent transactions",
            Panel::Stats => "statistics",
        })
    }
}

/// A panel rendered with its default value, and why
#[derive(Debug, Clone, PartialEq)]
pub struct DegradedPanel {
    pub panel: Panel,
    pub error: BankingError,
}

/// Everything the dashboard shows after one load
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub account: AccountSnapshot,
    pub recent: Vec<Transaction>,
    pub stats: DashboardStats,
    pub has_more_history: bool,
    pub degraded: Vec<DegradedPanel>,
}

impl DashboardView {
    pub fn is_degraded(&self, panel: Panel) -> bool {
        self.degraded.iter().any(|d| d.panel == panel)
    }
}

/// Loads the dashboard's account, recent history and statistics together
pub struct DashboardAggregator {
    session: Arc<SessionStore>,
    service: Arc<dyn AccountService>,
    history: HistoryPaginator,
    page_size: u32,
    stats_window_days: u32,
}

impl DashboardAggregator {
    /// Create an aggregator
    ///
    /// # Arguments
    ///
    /// * `page_size` - Number of recent transactions to show
    /// * `stats_window_days` - Trailing window for the income/expense summary
    pub fn new(
        session: Arc<SessionStore>,
        service: Arc<dyn AccountService>,
        page_size: u32,
        stats_window_days: u32,
    ) -> Self {
        let history = HistoryPaginator::new(session.clone(), service.clone());
        DashboardAggregator {
            session,
            service,
            history,
            page_size,
            stats_window_days,
        }
    }

    /// Refresh the account and load recent history and statistics concurrently
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a session, or the account fetch error.
    /// History and statistics failures never fail the load.
    pub async fn load(&mut self) -> Result<DashboardView, BankingError> {
        let (token, snapshot) = self.session.require_session()?;
        let account_id = snapshot.id;
        let ticket = self.session.read_ticket();

        let service = &self.service;
        let history = &mut self.history;
        let (page_size, days) = (self.page_size, self.stats_window_days);

        let (account, recent, stats) = futures::join!(
            service.fetch_account(&token, account_id),
            async { history.load_first_page(account_id, page_size).await.map(|_| ()) },
            service.fetch_stats(&token, account_id, days),
        );

        let fetched = account.map_err(|e| {
            warn!(account_id, error = %e, "Dashboard account refresh failed");
            e
        })?;
        if !self.session.apply_fetched_snapshot(ticket, fetched) {
            debug!(account_id, "Keeping snapshot from a newer mutation");
        }
        let account = self.session.snapshot().ok_or(BankingError::NotSignedIn)?;

        let mut degraded = Vec::new();
        if let Err(error) = recent {
            warn!(error = %error, "Dashboard history unavailable");
            self.history.reset();
            degraded.push(DegradedPanel {
                panel: Panel::History,
                error,
            });
        }
        let stats = stats.unwrap_or_else(|error| {
            warn!(error = %error, "Dashboard statistics unavailable");
            degraded.push(DegradedPanel {
                panel: Panel::Stats,
                error,
            });
            DashboardStats::default()
        });

        let has_more_history = degraded.iter().all(|d| d.panel != Panel::History)
            && self.history.has_more();

        Ok(DashboardView {
            account,
            recent: self.history.transactions().to_vec(),
            stats,
            has_more_history,
            degraded,
        })
    }

    /// Paginator holding the dashboard's recent history
    pub fn history(&self) -> &HistoryPaginator {
        &self.history
    }
}
