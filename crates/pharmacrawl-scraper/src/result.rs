//! The outcome of one crawl run.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use pharmacrawl_core::{Record, SiteVariant};
use serde::Serialize;

use crate::error::{FetchError, FetchErrorKind};
use crate::types::Target;

/// One failure manifest entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FailedTarget {
    /// Human-readable form of `target`, e.g. `listing … page 3/10`.
    pub description: String,
    pub target: Target,
    pub kind: FetchErrorKind,
    pub message: String,
}

impl FailedTarget {
    #[must_use]
    pub fn new(target: &Target, err: &FetchError) -> Self {
        Self {
            description: target.describe(),
            target: target.clone(),
            kind: err.kind,
            message: err.message.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CategoryCounts {
    /// Pages requested.
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

/// Records in discovery order plus everything that went wrong.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    pub records: Vec<Record>,
    pub failures: Vec<FailedTarget>,
    /// Keyed by category label.
    pub categories: BTreeMap<String, CategoryCounts>,
    pub targets_attempted: usize,
    pub targets_succeeded: usize,
    pub challenge_timeouts: usize,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

impl CrawlResult {
    #[must_use]
    pub fn new(started_at: DateTime<Utc>) -> Self {
        Self {
            records: Vec::new(),
            failures: Vec::new(),
            categories: BTreeMap::new(),
            targets_attempted: 0,
            targets_succeeded: 0,
            challenge_timeouts: 0,
            cancelled: false,
            started_at,
            finished_at: started_at,
        }
    }

    #[must_use]
    pub fn statistics(&self) -> CrawlStatistics {
        CrawlStatistics::from_result(self)
    }

    /// Final status line for the run.
    #[must_use]
    pub fn summary_message(&self) -> String {
        if self.cancelled {
            format!("Cancelled after {} products", self.records.len())
        } else if self.records.is_empty() {
            "No products were scraped".to_string()
        } else {
            format!(
                "Completed! Scraped {} products in {} minutes",
                self.records.len(),
                duration_minutes(self.started_at, self.finished_at)
            )
        }
    }
}

/// Aggregate counters published with the final status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlStatistics {
    pub total_products: usize,
    pub medication_products: usize,
    pub care_products: usize,
    pub pages_scraped: usize,
    pub failed_count: usize,
    /// The failure manifest of the run, in crawl order.
    pub failed_pages: Vec<FailedTarget>,
    /// Wall-clock minutes, two decimals.
    pub duration: String,
    pub with_price: usize,
    pub with_discount: usize,
    pub with_product_code: usize,
    pub from_legacy_site: usize,
    pub from_current_site: usize,
}

impl CrawlStatistics {
    #[must_use]
    pub fn from_result(result: &CrawlResult) -> Self {
        let records = &result.records;
        let count = |pred: fn(&Record) -> bool| records.iter().filter(|r| pred(r)).count();
        Self {
            total_products: records.len(),
            medication_products: count(Record::is_medication),
            care_products: count(Record::is_care_product),
            pages_scraped: result.targets_succeeded,
            failed_count: result.failures.len(),
            failed_pages: result.failures.clone(),
            duration: duration_minutes(result.started_at, result.finished_at),
            with_price: count(|r| !r.price.is_empty()),
            with_discount: count(Record::has_discount),
            with_product_code: count(|r| !r.product_code.is_empty()),
            from_legacy_site: count(|r| r.source == SiteVariant::Legacy),
            from_current_site: count(|r| r.source == SiteVariant::Current),
        }
    }
}

fn duration_minutes(start: DateTime<Utc>, end: DateTime<Utc>) -> String {
    #[allow(clippy::cast_precision_loss)]
    let minutes = (end - start).num_milliseconds().max(0) as f64 / 60_000.0;
    format!("{minutes:.2}")
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn record(category: &str, price: &str, price_old: &str, code: &str, source: SiteVariant) -> Record {
        Record {
            product_code: code.to_string(),
            title: "Item".to_string(),
            price: price.to_string(),
            price_old: price_old.to_string(),
            category: category.to_string(),
            page_number: String::new(),
            source,
        }
    }

    fn result_with(records: Vec<Record>) -> CrawlResult {
        let started = Utc::now();
        let mut result = CrawlResult::new(started);
        result.records = records;
        result.finished_at = started + Duration::seconds(90);
        result
    }

    #[test]
    fn statistics_count_each_dimension() {
        let mut result = result_with(vec![
            record("https://shop.aversi.ge/ka/medication/-/", "5.50", "6.00", "A1", SiteVariant::Current),
            record("https://shop.aversi.ge/ka/care-products/oral-care/", "", "", "", SiteVariant::Current),
            record("", "8.00", "8.00", "999", SiteVariant::Legacy),
        ]);
        result.targets_succeeded = 3;
        let target = Target::DirectLookup {
            identifier: 1,
            site: SiteVariant::Legacy,
        };
        result.failures.push(FailedTarget::new(
            &target,
            &FetchError::new(FetchErrorKind::ExtractionEmpty, target.describe(), "no product"),
        ));

        let stats = result.statistics();
        assert_eq!(stats.total_products, 3);
        assert_eq!(stats.medication_products, 1);
        assert_eq!(stats.care_products, 1);
        assert_eq!(stats.pages_scraped, 3);
        assert_eq!(stats.failed_count, 1);
        assert_eq!(stats.failed_pages[0].description, "legacy lookup 1");
        assert_eq!(stats.failed_pages[0].kind, FetchErrorKind::ExtractionEmpty);
        assert_eq!(stats.duration, "1.50");
        assert_eq!(stats.with_price, 2);
        assert_eq!(stats.with_discount, 1);
        assert_eq!(stats.with_product_code, 2);
        assert_eq!(stats.from_legacy_site, 1);
        assert_eq!(stats.from_current_site, 2);
    }

    #[test]
    fn summary_message_reflects_outcome() {
        let done = result_with(vec![record("", "1.00", "", "", SiteVariant::Current)]);
        assert_eq!(done.summary_message(), "Completed! Scraped 1 products in 1.50 minutes");

        assert_eq!(result_with(vec![]).summary_message(), "No products were scraped");

        let mut cancelled = result_with(vec![record("", "", "", "", SiteVariant::Current)]);
        cancelled.cancelled = true;
        assert_eq!(cancelled.summary_message(), "Cancelled after 1 products");
    }

    #[test]
    fn statistics_serialize_the_failure_manifest() {
        let mut result = result_with(vec![]);
        let target = Target::ListingPage {
            base_url: "https://shop.aversi.ge/ka/medication/-/".to_string(),
            page_number: 2,
            page_size: 192,
            site: SiteVariant::Current,
            last_page: 12,
            category: "https://shop.aversi.ge/ka/medication/-/".to_string(),
        };
        result.failures.push(FailedTarget::new(
            &target,
            &FetchError::new(FetchErrorKind::NavigationTimeout, target.describe(), "timed out"),
        ));

        let json = serde_json::to_value(result.statistics()).unwrap();
        assert_eq!(json["failedCount"], 1);
        assert_eq!(
            json["failedPages"][0]["description"],
            "listing https://shop.aversi.ge/ka/medication/-/ page 2/12"
        );
        assert_eq!(json["failedPages"][0]["kind"], "navigation_timeout");
        assert_eq!(json["failedPages"][0]["target"]["pageNumber"], 2);
    }
}
