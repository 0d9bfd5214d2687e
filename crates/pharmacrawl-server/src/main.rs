mod api;
mod middleware;
mod runner;
mod scheduler;

use std::sync::Arc;

use pharmacrawl_export::ExportStore;
use pharmacrawl_scraper::{
    launch_options_from_config, ChromiumLauncher, CrawlPolicy, Crawler, FetchPolicy, Fetcher,
    FsScratchStore, StatusHandle,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use crate::api::{build_app, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = pharmacrawl_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let catalog = Arc::new(pharmacrawl_core::load_catalog(&config.catalog_path)?);
    tracing::info!(
        lookups = catalog.direct_lookups.len(),
        listings = catalog.listings.len(),
        discovery = catalog.discovery.as_ref().is_some_and(|d| d.enabled),
        "catalog loaded"
    );

    match pharmacrawl_scraper::wipe_scratch_dir(&config.scratch_dir).await {
        Ok(removed) => tracing::info!(
            dir = %config.scratch_dir.display(),
            removed,
            "scratch directory cleaned"
        ),
        Err(e) => tracing::warn!(
            dir = %config.scratch_dir.display(),
            error = %e,
            "could not clean scratch directory"
        ),
    }

    let fetcher = Fetcher::new(
        Arc::new(ChromiumLauncher),
        Arc::new(FsScratchStore::new(config.scratch_dir.clone())),
        launch_options_from_config(&config),
        FetchPolicy::from_config(&config),
        catalog.origins.clone(),
    );
    let shutdown = CancellationToken::new();
    let state = AppState {
        status: StatusHandle::new(),
        crawler: Crawler::new(fetcher, CrawlPolicy::from_config(&config)),
        catalog,
        export: ExportStore::new(config.data_dir.clone()),
        shutdown: shutdown.clone(),
    };

    let _scheduler =
        scheduler::build_scheduler(state.clone(), config.crawl_schedule.as_deref()).await?;

    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;
    Ok(())
}

/// Waits for Ctrl-C or SIGTERM, then cancels any running crawl.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, cancelling crawl and shutting down");
    shutdown.cancel();
}
