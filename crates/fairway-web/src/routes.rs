use std::sync::Arc;

use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use fairway_core::{EnrichmentRequest, EnrichmentStatus, EnrichmentSummary, Orchestrator};

use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    Router::new()
        .route("/enrich", post(enrich))
        .route("/health", get(health))
        .with_state(AppState { orchestrator })
        .layer(TraceLayer::new_for_http())
}

#[derive(Debug, Deserialize)]
struct EnrichBody {
    course_name: String,
    region_code: String,
    #[serde(default)]
    website: Option<String>,
}

#[derive(Debug, Serialize)]
struct EnrichResponse {
    course_id: Option<Uuid>,
    status: EnrichmentStatus,
    summary: EnrichmentSummary,
}

async fn enrich(
    State(state): State<AppState>,
    Json(body): Json<EnrichBody>,
) -> Result<Json<EnrichResponse>, ApiError> {
    let request = EnrichmentRequest::new(body.course_name, body.region_code, body.website)
        .map_err(ApiError::bad_request)?;

    let summary = state.orchestrator.enrich_course(request).await;
    Ok(Json(EnrichResponse {
        course_id: summary.course_id,
        status: summary.status,
        summary,
    }))
}

/// Liveness only; readiness is the writer's concern.
async fn health() -> &'static str {
    "ok"
}
