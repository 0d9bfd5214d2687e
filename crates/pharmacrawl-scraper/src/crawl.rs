//! The crawl controller: walks the work list one target at a time.
//!
//! Per target the flow is fetch, extract, normalize, append. Failures are
//! caught at the target boundary and land in the manifest; a failing
//! listing page ends its own category and nothing else.

use std::path::PathBuf;
use std::time::Duration;

use chrono::Utc;
use pharmacrawl_core::{AppConfig, Record, SiteVariant};
use tokio_util::sync::CancellationToken;

use crate::error::{FetchError, FetchErrorKind, ScraperError};
use crate::extract::extract;
use crate::fetcher::{Fetcher, LiveFetcher};
use crate::normalize::normalize_record;
use crate::pagination::next_page;
use crate::rate_limit::sleep_or_cancel;
use crate::result::{CrawlResult, FailedTarget};
use crate::status::RunGuard;
use crate::types::{RawDocument, Target};

#[derive(Debug, Clone)]
pub struct CrawlPolicy {
    /// Pause between consecutive fetches.
    pub inter_request_delay: Duration,
    /// Where documents that failed legacy extraction are kept.
    pub debug_dir: Option<PathBuf>,
}

impl Default for CrawlPolicy {
    fn default() -> Self {
        Self {
            inter_request_delay: Duration::from_millis(3_000),
            debug_dir: None,
        }
    }
}

impl CrawlPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            inter_request_delay: Duration::from_millis(config.inter_request_delay_ms),
            debug_dir: Some(config.debug_dir.clone()),
        }
    }
}

/// How a single fetched page or lookup resolved.
enum Resolution {
    Records(Vec<Record>),
    Failed,
    Cancelled,
}

#[derive(Clone)]
pub struct Crawler {
    fetcher: Fetcher,
    policy: CrawlPolicy,
}

impl Crawler {
    #[must_use]
    pub fn new(fetcher: Fetcher, policy: CrawlPolicy) -> Self {
        Self { fetcher, policy }
    }

    #[must_use]
    pub fn fetcher(&self) -> &Fetcher {
        &self.fetcher
    }

    /// Launches a browser, crawls every target and closes the browser.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::SetupFailure`] if the browser cannot be
    /// launched. Every per-target failure is reported inside the result.
    pub async fn run(
        &self,
        targets: Vec<Target>,
        guard: &mut RunGuard,
        cancel: &CancellationToken,
    ) -> Result<CrawlResult, ScraperError> {
        let live = self.fetcher.launch().await?;
        let result = self.run_with(&live, targets, guard, cancel).await;
        live.shutdown().await;
        Ok(result)
    }

    /// Crawls every target with an already running browser.
    pub async fn run_with(
        &self,
        live: &LiveFetcher,
        targets: Vec<Target>,
        guard: &mut RunGuard,
        cancel: &CancellationToken,
    ) -> CrawlResult {
        let mut result = CrawlResult::new(Utc::now());
        let total = targets.len();
        guard.set_total_units(total);
        tracing::info!(targets = total, "crawl started");

        for (index, target) in targets.into_iter().enumerate() {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }
            let more_targets = index + 1 < total;

            if target.is_listing() {
                self.crawl_category(live, target, &mut result, guard, cancel)
                    .await;
                guard.complete_unit();
            } else {
                self.crawl_lookup(live, &target, &mut result, guard, cancel)
                    .await;
                guard.complete_unit();
                if more_targets
                    && !result.cancelled
                    && !sleep_or_cancel(self.policy.inter_request_delay, cancel).await
                {
                    result.cancelled = true;
                }
            }

            if result.cancelled {
                break;
            }
        }

        result.finished_at = Utc::now();
        tracing::info!(
            records = result.records.len(),
            failures = result.failures.len(),
            challenge_timeouts = result.challenge_timeouts,
            cancelled = result.cancelled,
            "crawl finished"
        );
        result
    }

    async fn crawl_lookup(
        &self,
        live: &LiveFetcher,
        target: &Target,
        result: &mut CrawlResult,
        guard: &mut RunGuard,
        cancel: &CancellationToken,
    ) {
        let describe = target.describe();
        guard.begin_target(&describe, "");
        tracing::info!(target = %describe, "fetching product lookup");

        match self.resolve(live, target, result, cancel).await {
            Resolution::Records(records) => {
                tracing::info!(target = %describe, title = %records[0].title, "product extracted");
                result.records.extend(records);
            }
            Resolution::Failed => {}
            Resolution::Cancelled => result.cancelled = true,
        }
        guard.record_counts(result.records.len(), result.failures.len());
    }

    async fn crawl_category(
        &self,
        live: &LiveFetcher,
        first: Target,
        result: &mut CrawlResult,
        guard: &mut RunGuard,
        cancel: &CancellationToken,
    ) {
        let category = first.category().to_string();
        let mut current = Some(first);

        while let Some(page) = current.take() {
            if cancel.is_cancelled() {
                result.cancelled = true;
                break;
            }
            let Target::ListingPage {
                page_number,
                last_page,
                ..
            } = &page
            else {
                break;
            };
            let describe = page.describe();
            guard.begin_target(&describe, format!("Page {page_number}/{last_page}"));
            tracing::info!(target = %describe, "fetching listing page");
            result.categories.entry(category.clone()).or_default().attempted += 1;

            match self.resolve(live, &page, result, cancel).await {
                Resolution::Records(records) => {
                    let found = records.len();
                    tracing::info!(target = %describe, records = found, "listing page extracted");
                    result.records.extend(records);
                    result.categories.entry(category.clone()).or_default().succeeded += 1;
                    current = next_page(&page, found);
                    if current.is_none() {
                        tracing::info!(category = %category, "category finished");
                    }
                }
                Resolution::Failed => {
                    result.categories.entry(category.clone()).or_default().failed += 1;
                    tracing::warn!(category = %category, "stopping category after failed page");
                }
                Resolution::Cancelled => result.cancelled = true,
            }
            guard.record_counts(result.records.len(), result.failures.len());

            if current.is_some() && !sleep_or_cancel(self.policy.inter_request_delay, cancel).await
            {
                result.cancelled = true;
                break;
            }
        }
    }

    /// Fetch, extract and normalize one target, recording any failure.
    async fn resolve(
        &self,
        live: &LiveFetcher,
        target: &Target,
        result: &mut CrawlResult,
        cancel: &CancellationToken,
    ) -> Resolution {
        result.targets_attempted += 1;

        let document = match live.fetch(target, cancel).await {
            Ok(document) => document,
            Err(e) if e.kind == FetchErrorKind::Cancelled => return Resolution::Cancelled,
            Err(e) => {
                record_failure(result, target, &e);
                return Resolution::Failed;
            }
        };

        if document.challenge.timed_out {
            result.challenge_timeouts += 1;
            tracing::warn!(
                target = %target,
                kind = %FetchErrorKind::ChallengeTimeout,
                "challenge did not clear, extracting anyway"
            );
        }

        let records: Vec<Record> = extract(&document)
            .into_iter()
            .filter_map(normalize_record)
            .collect();

        if records.is_empty() {
            let err = FetchError::new(
                FetchErrorKind::ExtractionEmpty,
                target.describe(),
                "document held no product with a title",
            );
            record_failure(result, target, &err);
            if let Target::DirectLookup {
                identifier,
                site: SiteVariant::Legacy,
            } = target
            {
                self.save_debug_artifact(*identifier, &document).await;
            }
            live.release(&document.scratch_key).await;
            return Resolution::Failed;
        }

        live.release(&document.scratch_key).await;
        result.targets_succeeded += 1;
        Resolution::Records(records)
    }

    async fn save_debug_artifact(&self, identifier: u64, document: &RawDocument) {
        let Some(dir) = &self.policy.debug_dir else {
            return;
        };
        let path = dir.join(format!("failed_legacy_{identifier}.html"));
        let written = async {
            tokio::fs::create_dir_all(dir).await?;
            tokio::fs::write(&path, document.html.as_bytes()).await
        }
        .await;
        match written {
            Ok(()) => tracing::info!(path = %path.display(), "saved debug document"),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "could not save debug document");
            }
        }
    }
}

fn record_failure(result: &mut CrawlResult, target: &Target, err: &FetchError) {
    tracing::warn!(target = %target, kind = %err.kind, error = %err.message, "target failed");
    result.failures.push(FailedTarget::new(target, err));
}
