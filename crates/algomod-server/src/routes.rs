//! HTTP routes and handlers

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::pipeline::{ModerationPipeline, StageComparison};
use algomod_core::ModerationResult;

/// Shared application state: the pipeline (rule tables + backend handle,
/// both initialized once at startup) and the metrics handle
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<ModerationPipeline>,
    pub metrics: PrometheusHandle,
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/moderate", post(moderate))
        .route("/compare", post(compare))
        .fallback(fallback)
        // The demo UI runs on another origin
        .layer(CorsLayer::permissive())
        .layer(DefaultBodyLimit::max(64 * 1024))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct ModerateRequest {
    text: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    model: String,
    backend_reachable: bool,
}

/// Main moderation handler
async fn moderate(
    State(state): State<AppState>,
    payload: Result<Json<ModerateRequest>, JsonRejection>,
) -> Result<Json<ModerationResult>, AppError> {
    metrics::counter!("algomod_requests_total").increment(1);

    let Json(req) = payload?;
    let result = state.pipeline.moderate(&req.text).await?;
    info!(
        algospeak = result.algospeak_detected,
        classification = %result.classification,
        "request moderated"
    );
    Ok(Json(result))
}

/// Side-by-side stage comparison handler
async fn compare(
    State(state): State<AppState>,
    payload: Result<Json<ModerateRequest>, JsonRejection>,
) -> Result<Json<StageComparison>, AppError> {
    metrics::counter!("algomod_requests_total").increment(1);

    let Json(req) = payload?;
    let comparison = state.pipeline.compare(&req.text).await?;
    Ok(Json(comparison))
}

/// Liveness is process-local and independent of model availability: a down
/// backend reports as degraded here, never as a failed health check.
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let backend_reachable = state.pipeline.backend_reachable().await;
    Json(HealthResponse {
        status: "ok",
        model: state.pipeline.backend_name().to_string(),
        backend_reachable,
    })
}

async fn metrics(State(state): State<AppState>) -> String {
    state.metrics.render()
}

async fn fallback() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

/// Error handling: the caller always receives well-formed JSON, never a raw
/// error or stack trace
#[derive(Debug)]
pub enum AppError {
    Validation(String),
    Internal(String),
}

// A body that is not valid JSON gets the same structured validation error as
// an invalid field, never axum's plain-text rejection.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        metrics::counter!("algomod_validation_failures_total").increment(1);
        AppError::Validation(rejection.body_text())
    }
}

impl From<algomod_core::Error> for AppError {
    fn from(err: algomod_core::Error) -> Self {
        match err {
            algomod_core::Error::Validation(msg) => {
                metrics::counter!("algomod_validation_failures_total").increment(1);
                AppError::Validation(msg)
            }
            other => AppError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg),
            AppError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg)
            }
        };

        let body = json!({
            "error": {
                "message": message,
                "type": kind,
            }
        });

        (status, Json(body)).into_response()
    }
}
