use crate::infra::{AppState, RecommendRequest};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Extension;
use axum::Json;
use bullpen::error::AppError;
use bullpen::recommender::{LinearScorer, RecommendationResult};
use serde_json::json;
use tracing::info;

pub(crate) fn router() -> axum::Router {
    axum::Router::new()
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
        .route("/recommend", post(recommend_endpoint))
        .route("/api/v1/recommend", post(recommend_endpoint))
        .route("/api/v1/model/reload", post(reload_model_endpoint))
}

pub(crate) async fn healthcheck(Extension(state): Extension<AppState>) -> Json<serde_json::Value> {
    let scorer = state.engine.scorer();
    Json(json!({
        "status": "ok",
        "model_loaded": scorer.is_ready(),
        "scorer": scorer.name(),
    }))
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

pub(crate) async fn recommend_endpoint(
    Extension(state): Extension<AppState>,
    Json(payload): Json<RecommendRequest>,
) -> Result<Json<RecommendationResult>, AppError> {
    let (situation, bullpen) = payload.into_domain()?;
    let result = state.engine.recommend(&situation, &bullpen)?;
    Ok(Json(result))
}

/// Re-reads the artifact at the configured path and swaps it in. Requests
/// already in flight finish on the model they started with.
pub(crate) async fn reload_model_endpoint(
    Extension(state): Extension<AppState>,
) -> Result<Json<serde_json::Value>, AppError> {
    let scorer = LinearScorer::from_path(state.model_path.as_path())?;
    scorer.check_horizon(state.engine.horizon_batters())?;
    let trained_at = scorer.trained_at;
    let previous = state.engine.scorer().replace(scorer);

    info!(
        path = %state.model_path.display(),
        %trained_at,
        previous = previous.name(),
        "model artifact reloaded"
    );

    Ok(Json(json!({
        "status": "reloaded",
        "scorer": state.engine.scorer().name(),
        "trained_at": trained_at,
    })))
}
