//! The `crawl` command: one full run straight to the artifact directory.

use std::sync::Arc;

use pharmacrawl_core::{AppConfig, CatalogFile};
use pharmacrawl_export::{ExportStore, ExportSummary};
use pharmacrawl_scraper::{
    enumerate, launch_options_from_config, ChromiumLauncher, CrawlPolicy, CrawlResult, Crawler,
    FetchPolicy, Fetcher, FsScratchStore, StatusHandle,
};
use tokio_util::sync::CancellationToken;

/// Crawls the whole catalog and writes the artifacts.
///
/// Ctrl-C cancels the run; records gathered before the interrupt are still
/// exported.
///
/// # Errors
///
/// Returns an error if the catalog cannot be loaded, the browser cannot be
/// launched, or the artifacts cannot be written.
pub(crate) async fn run_crawl(config: &AppConfig) -> anyhow::Result<()> {
    let catalog = pharmacrawl_core::load_catalog(&config.catalog_path)?;

    if let Err(e) = pharmacrawl_scraper::wipe_scratch_dir(&config.scratch_dir).await {
        tracing::warn!(dir = %config.scratch_dir.display(), error = %e, "could not clean scratch directory");
    }

    let fetcher = Fetcher::new(
        Arc::new(ChromiumLauncher),
        Arc::new(FsScratchStore::new(config.scratch_dir.clone())),
        launch_options_from_config(config),
        FetchPolicy::from_config(config),
        catalog.origins.clone(),
    );
    let crawler = Crawler::new(fetcher, CrawlPolicy::from_config(config));
    let export = ExportStore::new(config.data_dir.clone());

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling crawl");
            on_interrupt.cancel();
        }
    });

    let outcome = crawl_once(&crawler, &catalog, &export, &StatusHandle::new(), &cancel).await?;
    if let Some(summary) = outcome.summary {
        println!(
            "wrote {} records ({} medications, {} care, {} legacy) to {}",
            summary.total,
            summary.medications,
            summary.care,
            summary.legacy,
            export.dir().display()
        );
    }

    let result = outcome.result;
    println!("{}", result.summary_message());
    for failure in &result.failures {
        println!("  failed: {} ({}): {}", failure.description, failure.kind, failure.message);
    }
    Ok(())
}

struct CrawlOutcome {
    result: CrawlResult,
    /// `None` when the run produced no records and nothing was exported.
    summary: Option<ExportSummary>,
}

/// Launch, resolve, crawl, export. Once the browser is up it is shut down
/// on every path; only the record export can fail the run after that.
async fn crawl_once(
    crawler: &Crawler,
    catalog: &CatalogFile,
    export: &ExportStore,
    status: &StatusHandle,
    cancel: &CancellationToken,
) -> anyhow::Result<CrawlOutcome> {
    let mut guard = status.try_begin("Starting crawl")?;

    let live = match crawler.fetcher().launch().await {
        Ok(live) => live,
        Err(e) => {
            guard.fail(&e.to_string());
            return Err(e.into());
        }
    };
    let targets = enumerate(catalog, Some(&live), cancel).await;
    if let Err(e) = export.write_targets(&targets).await {
        tracing::warn!(error = %e, "could not persist target list");
    }

    let result = crawler.run_with(&live, targets, &mut guard, cancel).await;
    live.shutdown().await;

    if result.records.is_empty() {
        guard.finish(&result);
        return Ok(CrawlOutcome {
            result,
            summary: None,
        });
    }
    match export.write_records(&result.records).await {
        Ok(summary) => {
            guard.finish(&result);
            Ok(CrawlOutcome {
                result,
                summary: Some(summary),
            })
        }
        Err(e) => {
            guard.fail(&format!("export failed: {e}"));
            Err(e.into())
        }
    }
}
