use axum::{
    extract::{Query, State},
    http::header,
    response::{IntoResponse, Response},
    Extension, Json,
};
use pharmacrawl_core::Record;
use pharmacrawl_export::Sheet;
use serde::{Deserialize, Serialize};

use crate::middleware::RequestId;

use super::{map_export_error, ApiError, ApiResponse, AppState, ResponseMeta};

/// Records returned inline by the data endpoint; the rest is downloadable.
const PREVIEW_LIMIT: usize = 100;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CrawlData {
    total: usize,
    records: Vec<Record>,
}

#[derive(Debug, Deserialize)]
pub(super) struct SheetQuery {
    pub sheet: Option<String>,
}

pub(super) async fn crawl_data(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<CrawlData>>, ApiError> {
    let records = state
        .export
        .load_records()
        .await
        .map_err(|e| map_export_error(req_id.0.clone(), &e))?
        .ok_or_else(|| no_data(&req_id))?;

    let total = records.len();
    Ok(Json(ApiResponse {
        data: CrawlData {
            total,
            records: records.into_iter().take(PREVIEW_LIMIT).collect(),
        },
        meta: ResponseMeta::new(req_id.0),
    }))
}

pub(super) async fn download_json(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Response, ApiError> {
    let bytes = state
        .export
        .read_json()
        .await
        .map_err(|e| map_export_error(req_id.0.clone(), &e))?
        .ok_or_else(|| no_data(&req_id))?;

    Ok(attachment("application/json", "products.json", bytes))
}

const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

pub(super) async fn download_workbook(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Response, ApiError> {
    let bytes = state
        .export
        .read_workbook()
        .await
        .map_err(|e| map_export_error(req_id.0.clone(), &e))?
        .ok_or_else(|| no_data(&req_id))?;

    Ok(attachment(XLSX, "products.xlsx", bytes))
}

pub(super) async fn download_sheet(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SheetQuery>,
) -> Result<Response, ApiError> {
    let sheet: Sheet = query
        .sheet
        .as_deref()
        .unwrap_or_default()
        .parse()
        .map_err(|e: pharmacrawl_export::ExportError| {
            ApiError::new(req_id.0.clone(), "bad_request", e.to_string())
        })?;

    let bytes = state
        .export
        .read_sheet(sheet)
        .await
        .map_err(|e| map_export_error(req_id.0.clone(), &e))?
        .ok_or_else(|| no_data(&req_id))?;

    Ok(attachment("text/csv; charset=utf-8", sheet.file_name(), bytes))
}

fn no_data(req_id: &RequestId) -> ApiError {
    ApiError::new(
        req_id.0.clone(),
        "not_found",
        "no crawl data available; run a crawl first",
    )
}

fn attachment(content_type: &'static str, file_name: &str, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}
