//! Canonical product records shared by the scraper, export store and API.

use serde::{Deserialize, Serialize};

/// Markup generation a document belongs to.
///
/// The legacy origin serves one product per page with a theme-specific
/// layout; the current origin is a storefront with tiled listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteVariant {
    Legacy,
    Current,
}

impl SiteVariant {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SiteVariant::Legacy => "legacy",
            SiteVariant::Current => "current",
        }
    }
}

impl std::fmt::Display for SiteVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SiteVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" => Ok(SiteVariant::Legacy),
            "current" => Ok(SiteVariant::Current),
            other => Err(format!("unknown site variant '{other}'")),
        }
    }
}

/// One normalized product.
///
/// Field order is the export column order. `title` is never empty for a
/// record that left the scraper; `price`/`price_old` are either empty or a
/// fixed two-decimal string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub product_code: String,
    pub title: String,
    pub price: String,
    pub price_old: String,
    pub category: String,
    /// Listing page the record came from; empty for direct lookups.
    pub page_number: String,
    pub source: SiteVariant,
}

impl Record {
    /// A discount is a non-empty prior price that differs from the current one.
    #[must_use]
    pub fn has_discount(&self) -> bool {
        !self.price_old.is_empty() && self.price_old != self.price
    }

    /// Listed under a medication category.
    #[must_use]
    pub fn is_medication(&self) -> bool {
        self.category.contains("medication")
    }

    /// Listed under a care-products category.
    #[must_use]
    pub fn is_care_product(&self) -> bool {
        self.category.contains("care-products")
    }
}
