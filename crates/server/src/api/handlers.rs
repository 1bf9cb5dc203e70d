use axum::{extract::State, http::header, response::IntoResponse, Json};
use serde::Serialize;
use std::sync::Arc;

use ffmpegd_core::OrchestratorStatus;

use crate::metrics::{collect_dynamic_metrics, encode_metrics};
use crate::state::{AppState, ToolVersions};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub versions: ToolVersions,
    pub uptime_secs: i64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now() - state.started_at();
    Json(HealthResponse {
        status: "ok".to_string(),
        versions: state.tool_versions().clone(),
        uptime_secs: uptime.num_seconds(),
    })
}

/// GET /api/v1/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<OrchestratorStatus> {
    Json(state.orchestrator().status().await)
}

/// GET /metrics
pub async fn metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    collect_dynamic_metrics(&state).await;
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        encode_metrics(),
    )
}
