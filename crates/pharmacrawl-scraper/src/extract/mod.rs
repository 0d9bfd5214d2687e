//! Site-specific extraction of raw records from rendered HTML.
//!
//! One implementation per [`SiteVariant`]; [`extract`] picks it with a
//! closed match. Extractors copy text verbatim and leave cleaning to
//! [`crate::normalize`].

mod current;
mod legacy;

use pharmacrawl_core::SiteVariant;
use scraper::{ElementRef, Html, Selector};

pub use current::CurrentExtractor;
pub use legacy::LegacyExtractor;

use crate::types::{RawDocument, RawRecord, Target};

pub trait Extractor: Send + Sync {
    /// Produces zero or more raw records from one document.
    fn extract(&self, html: &Html, target: &Target) -> Vec<RawRecord>;
}

#[must_use]
pub fn extractor_for(site: SiteVariant) -> &'static dyn Extractor {
    match site {
        SiteVariant::Legacy => &LegacyExtractor,
        SiteVariant::Current => &CurrentExtractor,
    }
}

/// Extracts raw records from a fetched document.
#[must_use]
pub fn extract(document: &RawDocument) -> Vec<RawRecord> {
    extract_html(&document.html, &document.target)
}

/// Extracts raw records from HTML text as if it had been fetched for `target`.
#[must_use]
pub fn extract_html(html: &str, target: &Target) -> Vec<RawRecord> {
    let parsed = Html::parse_document(html);
    extractor_for(target.site()).extract(&parsed, target)
}

/// Concatenated text of every element matching `selector` below `scope`.
fn select_text(scope: ElementRef<'_>, selector: &Selector) -> String {
    scope
        .select(selector)
        .flat_map(|el| el.text())
        .collect::<String>()
}

/// Lookup identifier as a product code; empty for listing targets.
fn lookup_code(target: &Target) -> String {
    match target {
        Target::DirectLookup { identifier, .. } => identifier.to_string(),
        Target::ListingPage { .. } => String::new(),
    }
}

fn page_label(target: &Target) -> String {
    target.page_number().map(|n| n.to_string()).unwrap_or_default()
}
