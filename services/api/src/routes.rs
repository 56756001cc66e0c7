use crate::infra::AppState;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use recovery_engine::engine::{
    AccountSubmission, BatchOrchestrator, BatchOutcome, PredictionResult,
};
use recovery_engine::error::AppError;
use recovery_engine::ingest::parse_batch;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct AnalyzeRequest {
    /// Raw CSV text for one batch of overdue accounts.
    pub(crate) csv: String,
}

pub(crate) fn with_recovery_routes(orchestrator: Arc<BatchOrchestrator>) -> axum::Router {
    axum::Router::new()
        .route(
            "/api/v1/recovery/analyze",
            axum::routing::post(analyze_endpoint),
        )
        .route(
            "/api/v1/recovery/predict",
            axum::routing::post(predict_endpoint),
        )
        .route(
            "/api/v1/recovery/accounts",
            axum::routing::get(accounts_index_endpoint),
        )
        .route(
            "/api/v1/recovery/accounts/:account_id",
            axum::routing::get(account_detail_endpoint),
        )
        .with_state(orchestrator)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn analyze_endpoint(
    State(orchestrator): State<Arc<BatchOrchestrator>>,
    Json(payload): Json<AnalyzeRequest>,
) -> Result<Json<BatchOutcome>, AppError> {
    let rows = parse_batch(Cursor::new(payload.csv.into_bytes()))?;
    // Scoring runs a worker pool; keep it off the async executor.
    let outcome = tokio::task::spawn_blocking(move || orchestrator.submit(rows))
        .await
        .map_err(axum::Error::new)??;
    Ok(Json(outcome))
}

pub(crate) async fn predict_endpoint(
    State(orchestrator): State<Arc<BatchOrchestrator>>,
    Json(submission): Json<AccountSubmission>,
) -> Result<Json<PredictionResult>, AppError> {
    let prediction = orchestrator.submit_single(submission)?;
    Ok(Json(prediction))
}

pub(crate) async fn account_detail_endpoint(
    State(orchestrator): State<Arc<BatchOrchestrator>>,
    Path(account_id): Path<String>,
) -> Result<Json<PredictionResult>, AppError> {
    let prediction = orchestrator.lookup(&account_id)?;
    Ok(Json(prediction))
}

pub(crate) async fn accounts_index_endpoint(
    State(orchestrator): State<Arc<BatchOrchestrator>>,
) -> Json<serde_json::Value> {
    let ids = orchestrator.account_ids();
    Json(json!({
        "total_accounts": ids.len(),
        "account_ids": ids,
    }))
}
