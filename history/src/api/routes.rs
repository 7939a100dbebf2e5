use axum::{
    Json, Router,
    extract::{Path, State},
    routing::get,
};
use serde_json::Value;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use super::models::ApiResponse;
use crate::services::{AppError, HistoryService};

type ApiResult = Result<Json<ApiResponse<Vec<Value>>>, AppError>;

fn parse_run_id(run_id: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(run_id).map_err(|e| AppError::bad_request(format!("Invalid run id '{}': {}", run_id, e)))
}

pub async fn list_runs(State(service): State<Arc<HistoryService>>) -> ApiResult {
    Ok(Json(ApiResponse::success(service.list_runs().await?)))
}

pub async fn run_datasets(
    Path(run_id): Path<String>,
    State(service): State<Arc<HistoryService>>,
) -> ApiResult {
    let run_id = parse_run_id(&run_id)?;
    Ok(Json(ApiResponse::success(service.run_datasets(run_id).await?)))
}

pub async fn run_errors(
    Path(run_id): Path<String>,
    State(service): State<Arc<HistoryService>>,
) -> ApiResult {
    let run_id = parse_run_id(&run_id)?;
    Ok(Json(ApiResponse::success(service.run_errors(run_id).await?)))
}

pub async fn run_providers(
    Path(run_id): Path<String>,
    State(service): State<Arc<HistoryService>>,
) -> ApiResult {
    let run_id = parse_run_id(&run_id)?;
    Ok(Json(ApiResponse::success(service.provider_summary(run_id).await?)))
}

pub async fn version_summary(State(service): State<Arc<HistoryService>>) -> ApiResult {
    Ok(Json(ApiResponse::success(service.version_summary().await?)))
}

// Define all API routes
pub fn routes(service: Arc<HistoryService>) -> Router {
    Router::new()
        .route("/runs", get(list_runs))
        .route("/runs/{run_id}/datasets", get(run_datasets))
        .route("/runs/{run_id}/errors", get(run_errors))
        .route("/runs/{run_id}/providers", get(run_providers))
        .route("/summary/versions", get(version_summary))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
