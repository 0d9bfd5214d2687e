//! The single start path shared by the HTTP trigger and the scheduler.

use pharmacrawl_scraper::{enumerate, RunGuard, ScraperError, Target};
use thiserror::Error;
use tokio::sync::oneshot;

use crate::api::AppState;

#[derive(Debug, Error)]
pub enum StartError {
    #[error("a crawl is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Setup(#[from] ScraperError),

    #[error("crawl task ended before the run was under way")]
    Interrupted,
}

type Started = Result<Vec<Target>, StartError>;

/// Claims the run and hands it to a background task that launches the
/// browser, resolves the work list and crawls.
///
/// Returns the resolved targets as soon as the run is under way. The run
/// belongs to the task, so dropping this future (a client disconnecting
/// mid-launch, say) never aborts it.
///
/// # Errors
///
/// Returns [`StartError::AlreadyRunning`] without touching the status if a
/// run is in progress, or [`StartError::Setup`] if the browser cannot be
/// launched. A setup failure leaves the status not running with an error
/// message.
pub async fn start_crawl(state: &AppState) -> Result<Vec<Target>, StartError> {
    let guard = state
        .status
        .try_begin("Starting crawl")
        .map_err(|_| StartError::AlreadyRunning)?;

    let (started_tx, started_rx) = oneshot::channel();
    tokio::spawn(run(state.clone(), guard, started_tx));
    started_rx.await.unwrap_or(Err(StartError::Interrupted))
}

async fn run(state: AppState, mut guard: RunGuard, started: oneshot::Sender<Started>) {
    guard.set_message("Launching browser");
    let live = match state.crawler.fetcher().launch().await {
        Ok(live) => live,
        Err(e) => {
            tracing::error!(error = %e, "browser launch failed");
            guard.fail(&e.to_string());
            let _ = started.send(Err(e.into()));
            return;
        }
    };

    let cancel = state.shutdown.child_token();
    guard.set_message("Resolving targets");
    let targets = enumerate(&state.catalog, Some(&live), &cancel).await;
    if let Err(e) = state.export.write_targets(&targets).await {
        tracing::warn!(error = %e, "could not persist target list");
    }

    guard.set_message(format!("Crawling {} targets", targets.len()));
    if started.send(Ok(targets.clone())).is_err() {
        tracing::debug!("start request went away, crawling anyway");
    }

    let result = state
        .crawler
        .run_with(&live, targets, &mut guard, &cancel)
        .await;
    live.shutdown().await;

    if result.records.is_empty() {
        guard.finish(&result);
        return;
    }
    match state.export.write_records(&result.records).await {
        Ok(_) => guard.finish(&result),
        Err(e) => {
            tracing::error!(error = %e, "export failed");
            guard.fail(&format!("export failed: {e}"));
        }
    }
}
