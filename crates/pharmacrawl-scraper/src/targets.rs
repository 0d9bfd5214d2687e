//! Builds the ordered work list from the catalog.
//!
//! Order is fixed: legacy lookups, current lookups, then category listings
//! (static descriptors first, discovered ones after). Listings are keyed by
//! normalized URL and the first occurrence wins.

use std::collections::HashSet;

use pharmacrawl_core::{CatalogFile, DiscoveryConfig, ListingDescriptor, SiteVariant};
use regex::Regex;
use scraper::{Html, Selector};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::FetchError;
use crate::fetcher::LiveFetcher;
use crate::types::Target;

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("invalid link selector '{0}'")]
    Selector(String),

    #[error("invalid path pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("invalid index URL: {0}")]
    IndexUrl(#[from] url::ParseError),
}

/// Canonical identity of a category URL: lowercase host, no query or
/// fragment, trailing slash. `None` for unparsable input.
#[must_use]
pub fn normalize_category_url(raw: &str) -> Option<String> {
    let mut parsed = Url::parse(raw.trim()).ok()?;
    parsed.set_query(None);
    parsed.set_fragment(None);
    if !parsed.path().ends_with('/') {
        let path = format!("{}/", parsed.path());
        parsed.set_path(&path);
    }
    Some(parsed.to_string())
}

/// Targets that need no network: direct lookups and static listings.
#[must_use]
pub fn static_targets(catalog: &CatalogFile) -> Vec<Target> {
    assemble(catalog, &[])
}

/// Full work list, including categories discovered from the index page.
///
/// Discovery runs only when configured and enabled, and only with a live
/// browser. Any discovery failure is logged and the static list is used.
pub async fn enumerate(
    catalog: &CatalogFile,
    fetcher: Option<&LiveFetcher>,
    cancel: &CancellationToken,
) -> Vec<Target> {
    let discovered = match (&catalog.discovery, fetcher) {
        (Some(discovery), Some(fetcher)) if discovery.enabled => {
            match discover(fetcher, discovery, cancel).await {
                Ok(found) => {
                    tracing::info!(categories = found.len(), "discovered category listings");
                    found
                }
                Err(e) => {
                    tracing::warn!(error = %e, "category discovery failed, using static listings");
                    Vec::new()
                }
            }
        }
        _ => Vec::new(),
    };

    let targets = assemble(catalog, &discovered);
    tracing::info!(
        targets = targets.len(),
        lookups = catalog.direct_lookups.len(),
        "enumerated crawl targets"
    );
    targets
}

async fn discover(
    fetcher: &LiveFetcher,
    discovery: &DiscoveryConfig,
    cancel: &CancellationToken,
) -> Result<Vec<ListingDescriptor>, DiscoveryError> {
    let html = fetcher.fetch_index(&discovery.index_url, cancel).await?;
    discover_listings(&html, discovery)
}

/// Parses category links out of an index page.
///
/// # Errors
///
/// Returns [`DiscoveryError`] if the selector, pattern or index URL in the
/// discovery settings is invalid.
pub fn discover_listings(
    html: &str,
    discovery: &DiscoveryConfig,
) -> Result<Vec<ListingDescriptor>, DiscoveryError> {
    let selector = Selector::parse(&discovery.link_selector)
        .map_err(|_| DiscoveryError::Selector(discovery.link_selector.clone()))?;
    let pattern = Regex::new(&discovery.path_pattern)?;
    let index = Url::parse(&discovery.index_url)?;
    let denied: HashSet<String> = discovery
        .deny
        .iter()
        .filter_map(|d| normalize_category_url(d))
        .collect();

    let document = Html::parse_document(html);
    let listings = document
        .select(&selector)
        .filter_map(|link| link.value().attr("href"))
        .filter_map(|href| index.join(href.trim()).ok())
        .filter(|url| pattern.is_match(url.path()))
        .filter_map(|url| normalize_category_url(url.as_str()))
        .filter(|url| !denied.contains(url))
        .map(|url| ListingDescriptor {
            url,
            start_page: discovery.start_page,
            end_page: discovery.end_page,
            page_size: discovery.page_size,
            site: SiteVariant::Current,
            category: None,
        })
        .collect();
    Ok(listings)
}

fn assemble(catalog: &CatalogFile, discovered: &[ListingDescriptor]) -> Vec<Target> {
    let lookups = &catalog.direct_lookups;
    let mut targets: Vec<Target> = lookups
        .legacy
        .iter()
        .map(|&identifier| Target::DirectLookup {
            identifier,
            site: SiteVariant::Legacy,
        })
        .chain(lookups.current.iter().map(|&identifier| Target::DirectLookup {
            identifier,
            site: SiteVariant::Current,
        }))
        .collect();

    let mut seen = HashSet::new();
    for descriptor in catalog.listings.iter().chain(discovered) {
        let key = normalize_category_url(&descriptor.url).unwrap_or_else(|| descriptor.url.clone());
        if !seen.insert(key) {
            tracing::debug!(url = %descriptor.url, "dropping duplicate category listing");
            continue;
        }
        targets.push(Target::ListingPage {
            base_url: descriptor.url.clone(),
            page_number: descriptor.start_page,
            page_size: descriptor.page_size,
            site: descriptor.site,
            last_page: descriptor.end_page,
            category: descriptor.category_label().to_string(),
        });
    }
    targets
}
