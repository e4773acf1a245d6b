//! Question answering and conversation management.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::routing::{delete, post};
use axum::{Json, Router};
use docsage_runtime::AnswerResult;
use serde::{Deserialize, Serialize};

use super::ApiError;
use crate::state::AppState;

const MAX_QUERY_CHARS: usize = 1000;

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub conversation_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClearResponse {
    pub cleared: bool,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/chat", post(chat))
        .route("/conversations/{id}", delete(clear_conversation))
}

/// POST /chat
async fn chat(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<AnswerResult>, ApiError> {
    validate_query(&req.query)?;
    let result = state
        .orchestrator
        .query(&req.query, req.conversation_id.as_deref())
        .await;
    Ok(Json(result))
}

/// DELETE /conversations/{id}
async fn clear_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Json<ClearResponse> {
    Json(ClearResponse {
        cleared: state.orchestrator.clear_conversation(&id),
    })
}

fn validate_query(query: &str) -> Result<(), ApiError> {
    if query.trim().is_empty() {
        return Err(ApiError::bad_request("Query cannot be empty"));
    }
    if query.chars().count() > MAX_QUERY_CHARS {
        return Err(ApiError::bad_request("Query is too long"));
    }
    Ok(())
}
