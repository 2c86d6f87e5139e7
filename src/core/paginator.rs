//! Transaction history pagination
//!
//! This module provides the `HistoryPaginator`, which accumulates fixed-size,
//! offset-based pages of history into one ordered, append-only sequence.
//!
//! # Guarantees
//!
//! - Server order (newest first) is preserved within and across pages
//! - `has_more` turns false exactly when a page comes back shorter than requested
//! - A failed fetch leaves the sequence and cursor untouched, so the same page
//!   can be retried
//!
//! Offsets are stable only while no new transaction is created mid-pagination.
//! A transaction created between page fetches shifts every later offset by one;
//! reloading from the first page is the recovery path.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::core::session_store::SessionStore;
use crate::core::traits::AccountService;
use crate::types::{AccountId, BankingError, Transaction, TransactionHistoryPage};

/// Accumulated, offset-paged view of an account's history
pub struct HistoryPaginator {
    session: Arc<SessionStore>,
    service: Arc<dyn AccountService>,
    transactions: Vec<Transaction>,
    cursor: u32,
    has_more: bool,
}

impl HistoryPaginator {
    /// Create an empty paginator
    ///
    /// `has_more` starts true: nothing has been fetched yet.
    pub fn new(session: Arc<SessionStore>, service: Arc<dyn AccountService>) -> Self {
        HistoryPaginator {
            session,
            service,
            transactions: Vec::new(),
            cursor: 0,
            has_more: true,
        }
    }

    /// Fetch the first page and replace everything accumulated so far
    ///
    /// On success the sequence is exactly that page and the cursor is `page_size`.
    ///
    /// # Errors
    ///
    /// Returns `NotSignedIn` without a session, or the fetch error. On error the
    /// previous sequence, cursor and `has_more` are kept.
    pub async fn load_first_page(
        &mut self,
        account_id: AccountId,
        page_size: u32,
    ) -> Result<&[Transaction], BankingError> {
        let page = self.fetch(account_id, page_size, 0).await?;
        self.has_more = !page.is_last();
        self.transactions = page.transactions;
        self.cursor = page_size;
        debug!(
            account_id,
            loaded = self.transactions.len(),
            has_more = self.has_more,
            "Loaded first history page"
        );
        Ok(&self.transactions)
    }

    /// Fetch the page at the cursor and append it
    ///
    /// Returns just the newly appended transactions.
    ///
    /// # Errors
    ///
    /// Same as [`HistoryPaginator::load_first_page`]; a failed page can be
    /// retried with another call, which requests the same offset.
    pub async fn load_next_page(
        &mut self,
        account_id: AccountId,
        page_size: u32,
    ) -> Result<&[Transaction], BankingError> {
        let offset = self.cursor;
        let page = self.fetch(account_id, page_size, offset).await?;
        let start = self.transactions.len();
        self.has_more = !page.is_last();
        self.transactions.extend(page.transactions);
        self.cursor = offset.saturating_add(page_size);
        debug!(
            account_id,
            offset,
            appended = self.transactions.len() - start,
            has_more = self.has_more,
            "Loaded next history page"
        );
        Ok(&self.transactions[start..])
    }

    async fn fetch(
        &self,
        account_id: AccountId,
        page_size: u32,
        offset: u32,
    ) -> Result<TransactionHistoryPage, BankingError> {
        let (token, _) = self.session.require_session()?;
        let result = self
            .service
            .fetch_history(&token, account_id, page_size, offset)
            .await;
        if let Err(e) = &result {
            warn!(account_id, offset, error = %e, "History page fetch failed");
        }
        result
    }

    /// Everything loaded so far, newest first
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Offset the next page will be requested at
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    /// Whether another page may exist
    pub fn has_more(&self) -> bool {
        self.has_more
    }

    /// Forget everything loaded
    pub fn reset(&mut self) {
        self.transactions.clear();
        self.cursor = 0;
        self.has_more = true;
    }
}
