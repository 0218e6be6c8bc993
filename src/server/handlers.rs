//! Endpoint handlers

use axum::extract::rejection::PathRejection;
use axum::extract::{Path, State};
use axum::Json;
use serde_json::{json, Value};
use tracing::debug;

use super::error::{ApiError, ApiResult};
use super::AppState;
use crate::core::resource::Resource;
use crate::search::query::SearchQuery;

/// `POST /search`
///
/// Runs on the blocking pool: a keyword search may embed the query text.
pub async fn search(
    State(state): State<AppState>,
    Json(query): Json<SearchQuery>,
) -> ApiResult<Vec<Resource>> {
    debug!(?query, "Search request");
    let engine = state.engine.clone();

    let results = tokio::task::spawn_blocking(move || engine.search(&query))
        .await
        .map_err(|e| ApiError::internal(format!("Search task failed: {e}")))?;

    Ok(Json(results))
}

/// `GET /details/{resource_id}`
pub async fn details(
    State(state): State<AppState>,
    resource_id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Resource> {
    let Path(resource_id) = resource_id?;
    Ok(Json(state.engine.get(resource_id)?))
}

/// `GET /demo`
pub async fn demo(State(state): State<AppState>) -> Json<Vec<Resource>> {
    Json(state.engine.all())
}

/// `GET /health`
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
