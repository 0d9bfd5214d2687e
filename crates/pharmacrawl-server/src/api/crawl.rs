use axum::{extract::State, Extension, Json};
use pharmacrawl_scraper::{CrawlStatus, Target};
use serde::Serialize;

use crate::middleware::RequestId;
use crate::runner::{start_crawl as begin_run, StartError};

use super::{ApiError, ApiResponse, AppState, ResponseMeta};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CrawlStarted {
    message: String,
    total_targets: usize,
    targets: Vec<Target>,
}

pub(super) async fn start_crawl(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CrawlStarted>>, ApiError> {
    match begin_run(&state).await {
        Ok(targets) => Ok(Json(ApiResponse {
            data: CrawlStarted {
                message: "Crawl started".to_string(),
                total_targets: targets.len(),
                targets,
            },
            meta: ResponseMeta::new(req_id.0),
        })),
        Err(StartError::AlreadyRunning) => Err(ApiError::new(
            req_id.0,
            "conflict",
            "a crawl is already running",
        )),
        Err(StartError::Setup(e)) => Err(ApiError::new(
            req_id.0,
            "setup_failure",
            format!("could not start crawl: {e}"),
        )),
        Err(e @ StartError::Interrupted) => Err(ApiError::new(
            req_id.0,
            "internal_error",
            e.to_string(),
        )),
    }
}

/// The status document is served bare, without the response envelope, so
/// pollers read `isRunning` and `progress` at the top level.
pub(super) async fn crawl_status(State(state): State<AppState>) -> Json<CrawlStatus> {
    Json(state.status.snapshot())
}
