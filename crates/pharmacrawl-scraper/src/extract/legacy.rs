use std::sync::LazyLock;

use pharmacrawl_core::SiteVariant;
use scraper::{Html, Selector};

use super::{lookup_code, page_label, select_text, Extractor};
use crate::types::{RawRecord, Target};

static SUMMARY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".product-summary").expect("valid summary selector"));
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".product-title").expect("valid title selector"));
static PRICE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(".price .amount.text-theme-colored").expect("valid price selector")
});
static PRICE_OLD: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(".price del").expect("valid old price selector"));

/// Theme-based product page of the legacy site: one product per document.
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyExtractor;

impl Extractor for LegacyExtractor {
    fn extract(&self, html: &Html, target: &Target) -> Vec<RawRecord> {
        if html.select(&SUMMARY).next().is_none() {
            tracing::debug!(target = %target, "no .product-summary in legacy document");
            return Vec::new();
        }

        let root = html.root_element();
        let title = select_text(root, &TITLE);
        if title.trim().is_empty() {
            tracing::debug!(target = %target, "legacy document has no product title");
            return Vec::new();
        }

        vec![RawRecord {
            title,
            price_text: select_text(root, &PRICE),
            price_old_text: select_text(root, &PRICE_OLD),
            product_code: lookup_code(target),
            category: target.category().to_string(),
            page_number: page_label(target),
            source_site: SiteVariant::Legacy,
        }]
    }
}
