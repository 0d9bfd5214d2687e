//! Offline commands that need no browser.

use std::path::Path;

use anyhow::Context;
use pharmacrawl_core::{AppConfig, Record, SiteVariant};
use pharmacrawl_scraper::extract::extract_html;
use pharmacrawl_scraper::{normalize_record, static_targets, Target};

pub(crate) fn print_targets(config: &AppConfig, json: bool) -> anyhow::Result<()> {
    let catalog = pharmacrawl_core::load_catalog(&config.catalog_path)?;
    let targets = static_targets(&catalog);

    if json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
        return Ok(());
    }
    for target in &targets {
        println!("{}  {}", target.describe(), target.url(&catalog.origins));
    }
    println!("{} targets", targets.len());
    Ok(())
}

/// Target the saved document is interpreted as.
pub(crate) fn inspection_target(
    site: SiteVariant,
    listing: Option<String>,
    page: u32,
    id: u64,
) -> Target {
    match listing {
        Some(base_url) => Target::ListingPage {
            category: base_url.clone(),
            base_url,
            page_number: page,
            page_size: 0,
            site,
            last_page: page,
        },
        None => Target::DirectLookup {
            identifier: id,
            site,
        },
    }
}

pub(crate) fn extract_records(html: &str, target: &Target) -> Vec<Record> {
    extract_html(html, target)
        .into_iter()
        .filter_map(normalize_record)
        .collect()
}

pub(crate) fn extract_file(
    file: &Path,
    site: SiteVariant,
    listing: Option<String>,
    page: u32,
    id: u64,
) -> anyhow::Result<()> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let target = inspection_target(site, listing, page, id);
    let records = extract_records(&html, &target);

    if records.is_empty() {
        tracing::warn!(file = %file.display(), site = %site, "no products extracted");
    }
    println!("{}", serde_json::to_string_pretty(&records)?);
    Ok(())
}
