//! Banking client
//!
//! This module provides the `BankingClient` that wires the session store, the
//! transaction orchestrator and the account service together, and hands out
//! fresh history paginators and dashboard aggregators bound to the same session.

use std::sync::Arc;

use crate::config::ClientConfig;
use crate::core::dashboard::DashboardAggregator;
use crate::core::orchestrator::TransactionOrchestrator;
use crate::core::paginator::HistoryPaginator;
use crate::core::session_store::SessionStore;
use crate::core::traits::{AccountService, SessionStorage};
use crate::io::{FileSessionStorage, HttpAccountService};
use crate::types::BankingError;

/// One signed-in (or signed-out) client process
pub struct BankingClient {
    config: ClientConfig,
    service: Arc<dyn AccountService>,
    session: Arc<SessionStore>,
    orchestrator: TransactionOrchestrator,
}

impl BankingClient {
    /// Create a BankingClient over any service and storage
    ///
    /// The persisted session is restored immediately.
    ///
    /// # Arguments
    ///
    /// * `config` - Page sizes and statistics window
    /// * `service` - Remote account service
    /// * `storage` - Where the session is persisted
    pub fn new(
        config: ClientConfig,
        service: Arc<dyn AccountService>,
        storage: Box<dyn SessionStorage>,
    ) -> Self {
        let session = Arc::new(SessionStore::open(service.clone(), storage));
        let orchestrator = TransactionOrchestrator::new(session.clone(), service.clone());
        BankingClient {
            config,
            service,
            session,
            orchestrator,
        }
    }

    /// Create a BankingClient talking HTTP and persisting to `config.session_path`
    ///
    /// # Errors
    ///
    /// Returns `Config` if the base URL is invalid or the HTTP client cannot be built.
    pub fn connect(config: ClientConfig) -> Result<Self, BankingError> {
        let service = Arc::new(HttpAccountService::from_config(&config)?);
        let storage = Box::new(FileSessionStorage::new(config.session_path.clone()));
        Ok(Self::new(config, service, storage))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn session(&self) -> &Arc<SessionStore> {
        &self.session
    }

    pub fn orchestrator(&self) -> &TransactionOrchestrator {
        &self.orchestrator
    }

    /// Fresh paginator over this session's history
    pub fn history(&self) -> HistoryPaginator {
        HistoryPaginator::new(self.session.clone(), self.service.clone())
    }

    /// Fresh dashboard aggregator using the configured page size and window
    pub fn dashboard(&self) -> DashboardAggregator {
        DashboardAggregator::new(
            self.session.clone(),
            self.service.clone(),
            self.config.dashboard_page_size,
            self.config.stats_window_days,
        )
    }
}

impl std::fmt::Debug for BankingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BankingClient")
            .field("config", &self.config)
            .field("session", &self.session)
            .finish_non_exhaustive()
    }
}
