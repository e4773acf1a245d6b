//! Liveness and pipeline status.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use docsage_runtime::RuntimeStatus;
use serde::{Deserialize, Serialize};

use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub vector_db_ready: bool,
    pub embedding_model_ready: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
}

/// GET /health
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let status = state.orchestrator.status();
    Json(HealthResponse {
        status: "healthy".into(),
        timestamp: Utc::now(),
        vector_db_ready: status.index_fitted,
        embedding_model_ready: true,
    })
}

/// GET /status
async fn status(State(state): State<Arc<AppState>>) -> Json<RuntimeStatus> {
    Json(state.orchestrator.status())
}
