//! Process-wide crawl progress with a single writer per run.
//!
//! [`StatusHandle`] is shared freely; readers take cloned snapshots. The
//! only way to write is through the [`RunGuard`] returned by
//! [`StatusHandle::try_begin`], and at most one guard exists at a time.

use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::result::{CrawlResult, CrawlStatistics};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatus {
    pub is_running: bool,
    /// Percent of units completed, 0 to 100.
    pub progress: u8,
    pub total_units: usize,
    pub completed_units: usize,
    pub current_target: String,
    /// `Page i/n` while inside a category listing.
    pub current_category_progress: String,
    pub products_found: usize,
    pub failed_targets: usize,
    pub message: String,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub statistics: Option<CrawlStatistics>,
}

#[derive(Debug, Error)]
#[error("a crawl is already running")]
pub struct AlreadyRunning;

#[derive(Debug, Clone, Default)]
pub struct StatusHandle {
    inner: Arc<RwLock<CrawlStatus>>,
}

impl StatusHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> CrawlStatus {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_running
    }

    /// Atomically claims the writer role and resets the status for a new run.
    ///
    /// # Errors
    ///
    /// Returns [`AlreadyRunning`] without touching the status if a run holds
    /// the writer role.
    pub fn try_begin(&self, message: impl Into<String>) -> Result<RunGuard, AlreadyRunning> {
        let mut status = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if status.is_running {
            return Err(AlreadyRunning);
        }
        *status = CrawlStatus {
            is_running: true,
            message: message.into(),
            start_time: Some(Utc::now()),
            ..CrawlStatus::default()
        };
        Ok(RunGuard {
            inner: Arc::clone(&self.inner),
            finished: false,
        })
    }
}

/// Exclusive writer for the status of one run.
///
/// Dropping a guard that was never finished marks the run failed and frees
/// the slot for the next run.
#[derive(Debug)]
pub struct RunGuard {
    inner: Arc<RwLock<CrawlStatus>>,
    finished: bool,
}

impl RunGuard {
    fn write(&self) -> RwLockWriteGuard<'_, CrawlStatus> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.write().message = message.into();
    }

    pub fn set_total_units(&mut self, total: usize) {
        let mut status = self.write();
        status.total_units = total;
        status.progress = percent(status.completed_units, total);
    }

    pub fn begin_target(&mut self, describe: &str, category_progress: impl Into<String>) {
        let mut status = self.write();
        status.current_target = describe.to_string();
        status.current_category_progress = category_progress.into();
    }

    pub fn complete_unit(&mut self) {
        let mut status = self.write();
        status.completed_units = (status.completed_units + 1).min(status.total_units);
        status.progress = percent(status.completed_units, status.total_units);
    }

    pub fn record_counts(&mut self, products_found: usize, failed_targets: usize) {
        let mut status = self.write();
        status.products_found = products_found;
        status.failed_targets = failed_targets;
    }

    /// Publishes the result's statistics and summary and ends the run.
    pub fn finish(self, result: &CrawlResult) {
        let statistics = result.statistics();
        let message = result.summary_message();
        self.close(|status| {
            status.products_found = result.records.len();
            status.failed_targets = result.failures.len();
            if !result.cancelled {
                status.progress = 100;
                status.completed_units = status.total_units;
            }
            status.statistics = Some(statistics);
            status.message = message;
        });
    }

    /// Ends the run with an error message.
    pub fn fail(self, reason: &str) {
        let message = format!("Error: {reason}");
        self.close(|status| status.message = message);
    }

    fn close(mut self, apply: impl FnOnce(&mut CrawlStatus)) {
        {
            let mut status = self.write();
            apply(&mut status);
            status.is_running = false;
            status.current_target.clear();
            status.current_category_progress.clear();
            status.end_time = Some(Utc::now());
        }
        self.finished = true;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut status = self.write();
        status.is_running = false;
        status.end_time = Some(Utc::now());
        status.message = "Error: crawl aborted unexpectedly".to_string();
        tracing::warn!("crawl run guard dropped before the run finished");
    }
}

fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    u8::try_from((done.min(total) * 100) / total).unwrap_or(100)
}
