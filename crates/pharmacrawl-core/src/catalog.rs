//! Crawl catalog: which origins, identifiers and category listings to visit.
//!
//! Loaded from `config/catalog.yaml`. The catalog is static input; the
//! scraper's target enumerator turns it into an ordered work list and may
//! extend it with categories discovered from the storefront menu.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::records::SiteVariant;
use crate::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Origins {
    /// Root of the legacy site, e.g. `https://www.aversi.ge`.
    pub legacy: String,
    /// Root of the current storefront, e.g. `https://shop.aversi.ge`.
    pub current: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DirectLookups {
    #[serde(default)]
    pub legacy: Vec<u64>,
    #[serde(default)]
    pub current: Vec<u64>,
}

impl DirectLookups {
    #[must_use]
    pub fn len(&self) -> usize {
        self.legacy.len() + self.current.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.legacy.is_empty() && self.current.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingDescriptor {
    /// Category listing root; pages are addressed below it as `page-N/`.
    pub url: String,
    #[serde(default = "default_start_page")]
    pub start_page: u32,
    pub end_page: u32,
    pub page_size: u32,
    #[serde(default = "default_listing_site")]
    pub site: SiteVariant,
    /// Label copied into produced records. Defaults to `url`.
    #[serde(default)]
    pub category: Option<String>,
}

impl ListingDescriptor {
    #[must_use]
    pub fn category_label(&self) -> &str {
        self.category.as_deref().unwrap_or(&self.url)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Page whose navigation menu lists the category links.
    pub index_url: String,
    /// CSS selector matching candidate menu links.
    pub link_selector: String,
    /// Regex a link's URL path must match to count as a category.
    pub path_pattern: String,
    /// Absolute URLs never taken from discovery.
    #[serde(default)]
    pub deny: Vec<String>,
    #[serde(default = "default_start_page")]
    pub start_page: u32,
    pub end_page: u32,
    pub page_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogFile {
    pub origins: Origins,
    #[serde(default)]
    pub direct_lookups: DirectLookups,
    #[serde(default)]
    pub listings: Vec<ListingDescriptor>,
    #[serde(default)]
    pub discovery: Option<DiscoveryConfig>,
}

fn default_start_page() -> u32 {
    1
}

fn default_listing_site() -> SiteVariant {
    SiteVariant::Current
}

fn default_true() -> bool {
    true
}

/// Load and validate the crawl catalog from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_catalog(path: &Path) -> Result<CatalogFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::CatalogFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let catalog: CatalogFile =
        serde_yaml::from_str(&content).map_err(ConfigError::CatalogFileParse)?;

    validate_catalog(&catalog)?;

    Ok(catalog)
}

fn validate_catalog(catalog: &CatalogFile) -> Result<(), ConfigError> {
    require_absolute_url("origins.legacy", &catalog.origins.legacy)?;
    require_absolute_url("origins.current", &catalog.origins.current)?;

    for (site, ids) in [
        (SiteVariant::Legacy, &catalog.direct_lookups.legacy),
        (SiteVariant::Current, &catalog.direct_lookups.current),
    ] {
        let mut seen = HashSet::new();
        for id in ids {
            if !seen.insert(*id) {
                return Err(ConfigError::Validation(format!(
                    "duplicate {site} direct lookup identifier {id}"
                )));
            }
        }
    }

    for listing in &catalog.listings {
        require_absolute_url("listings[].url", &listing.url)?;
        validate_page_range(&listing.url, listing.start_page, listing.end_page, listing.page_size)?;
    }

    if let Some(discovery) = &catalog.discovery {
        require_absolute_url("discovery.index_url", &discovery.index_url)?;
        if discovery.link_selector.trim().is_empty() {
            return Err(ConfigError::Validation(
                "discovery.link_selector must be non-empty".to_string(),
            ));
        }
        regex::Regex::new(&discovery.path_pattern).map_err(|e| {
            ConfigError::Validation(format!(
                "discovery.path_pattern '{}' is not a valid regex: {e}",
                discovery.path_pattern
            ))
        })?;
        for denied in &discovery.deny {
            require_absolute_url("discovery.deny[]", denied)?;
        }
        validate_page_range(
            "discovery defaults",
            discovery.start_page,
            discovery.end_page,
            discovery.page_size,
        )?;
    }

    Ok(())
}

fn validate_page_range(
    what: &str,
    start_page: u32,
    end_page: u32,
    page_size: u32,
) -> Result<(), ConfigError> {
    if start_page == 0 {
        return Err(ConfigError::Validation(format!(
            "{what}: start_page must be at least 1"
        )));
    }
    if start_page > end_page {
        return Err(ConfigError::Validation(format!(
            "{what}: start_page {start_page} is after end_page {end_page}"
        )));
    }
    if page_size == 0 {
        return Err(ConfigError::Validation(format!(
            "{what}: page_size must be positive"
        )));
    }
    Ok(())
}

fn require_absolute_url(field: &str, value: &str) -> Result<(), ConfigError> {
    match url::Url::parse(value) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => Ok(()),
        Ok(parsed) => Err(ConfigError::Validation(format!(
            "{field}: unsupported scheme '{}' in {value}",
            parsed.scheme()
        ))),
        Err(e) => Err(ConfigError::Validation(format!(
            "{field}: '{value}' is not an absolute URL: {e}"
        ))),
    }
}

#[cfg(test)]
#[path = "catalog_test.rs"]
mod tests;
