//! Units of crawl work and the documents and records they produce.

use chrono::{DateTime, Utc};
use pharmacrawl_core::{Origins, SiteVariant};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::challenge::ChallengeOutcome;
use crate::pagination::listing_page_url;

/// One unit of crawl work. Immutable once enumerated; listing pages spawn
/// successors at runtime through [`crate::pagination::next_page`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Target {
    /// A single product page looked up by numeric identifier.
    DirectLookup { identifier: u64, site: SiteVariant },
    /// One page of a category listing.
    ListingPage {
        base_url: String,
        page_number: u32,
        page_size: u32,
        site: SiteVariant,
        /// Highest page number the category may spawn.
        last_page: u32,
        /// Label copied into every record from this category.
        category: String,
    },
}

impl Target {
    #[must_use]
    pub fn site(&self) -> SiteVariant {
        match self {
            Target::DirectLookup { site, .. } | Target::ListingPage { site, .. } => *site,
        }
    }

    #[must_use]
    pub fn is_listing(&self) -> bool {
        matches!(self, Target::ListingPage { .. })
    }

    /// Category label for listings; empty for direct lookups.
    #[must_use]
    pub fn category(&self) -> &str {
        match self {
            Target::DirectLookup { .. } => "",
            Target::ListingPage { category, .. } => category,
        }
    }

    #[must_use]
    pub fn page_number(&self) -> Option<u32> {
        match self {
            Target::DirectLookup { .. } => None,
            Target::ListingPage { page_number, .. } => Some(*page_number),
        }
    }

    /// Stable human-readable identity used in logs and the failure manifest.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Target::DirectLookup { identifier, site } => format!("{site} lookup {identifier}"),
            Target::ListingPage {
                base_url,
                page_number,
                last_page,
                ..
            } => format!("listing {base_url} page {page_number}/{last_page}"),
        }
    }

    /// Stable file-name-safe key for the scratch copy of this target's document.
    #[must_use]
    pub fn scratch_key(&self) -> String {
        match self {
            Target::DirectLookup { identifier, site } => format!("{site}_matid_{identifier}"),
            Target::ListingPage {
                base_url,
                page_number,
                ..
            } => {
                let digest = Sha256::digest(base_url.as_bytes());
                let short: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
                format!("page_{short}_{page_number}")
            }
        }
    }

    /// Absolute URL to navigate to.
    #[must_use]
    pub fn url(&self, origins: &Origins) -> String {
        match self {
            Target::DirectLookup {
                identifier,
                site: SiteVariant::Legacy,
            } => format!(
                "{}/ka/aversi/act/drugDet/?MatID={identifier}",
                origins.legacy.trim_end_matches('/')
            ),
            Target::DirectLookup {
                identifier,
                site: SiteVariant::Current,
            } => format!(
                "{}/?dispatch=aversi.redirect&matid={identifier}",
                origins.current.trim_end_matches('/')
            ),
            Target::ListingPage {
                base_url,
                page_number,
                page_size,
                ..
            } => listing_page_url(base_url, *page_number, *page_size),
        }
    }
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Rendered HTML for one target, as captured by the fetcher.
#[derive(Debug, Clone)]
pub struct RawDocument {
    pub html: String,
    pub target: Target,
    pub fetched_at: DateTime<Utc>,
    pub scratch_key: String,
    /// What the challenge gate saw while loading this document.
    pub challenge: ChallengeOutcome,
}

/// Fields exactly as extracted, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    pub title: String,
    pub price_text: String,
    pub price_old_text: String,
    pub product_code: String,
    pub category: String,
    pub page_number: String,
    pub source_site: SiteVariant,
}
