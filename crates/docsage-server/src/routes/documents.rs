//! Document upload and ingestion.

use std::sync::Arc;

use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};
use docsage_core::Error;
use docsage_ingest::DocumentExtractor;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::ApiError;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
    pub chunks_created: usize,
    pub total_tokens: usize,
    pub status: String,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/upload", post(upload))
}

/// POST /upload: multipart, first field carrying a file name.
async fn upload(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let field = loop {
        match multipart.next_field().await {
            Ok(Some(field)) if field.file_name().is_some() => break field,
            Ok(Some(_)) => continue,
            Ok(None) => return Err(ApiError::bad_request("No file provided")),
            Err(e) => return Err(ApiError::bad_request(format!("Malformed upload: {e}"))),
        }
    };

    let filename = sanitize_filename(field.file_name().unwrap_or_default());
    if !DocumentExtractor::supports(&filename) {
        return Err(ApiError::bad_request("Only PDF and TXT files are supported"));
    }

    let bytes = field
        .bytes()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed upload: {e}")))?;

    let upload_path = state.config().data_paths.uploads.join(&filename);
    tokio::fs::write(&upload_path, &bytes)
        .await
        .map_err(|e| ApiError::internal(format!("Upload failed: {e}")))?;
    info!("Received {} ({} bytes)", filename, bytes.len());

    let document_name = document_name(&filename);
    let orchestrator = state.orchestrator.clone();
    let report = tokio::task::spawn_blocking(move || {
        orchestrator.ingest(&upload_path, &document_name)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Upload failed: {e}")))?
    .map_err(|e| {
        warn!("Ingestion of {} failed: {}", filename, e);
        match e {
            Error::Extraction(_) | Error::Ingest(_) | Error::Index(_) => {
                ApiError::bad_request(e.to_string())
            }
            other => ApiError::internal(format!("Upload failed: {other}")),
        }
    })?;

    Ok(Json(UploadResponse {
        filename,
        chunks_created: report.chunks_created,
        total_tokens: report.total_tokens,
        status: "success".into(),
    }))
}

/// Strip directory components from a client-supplied name.
fn sanitize_filename(name: &str) -> String {
    let name = name.replace(['/', '\\'], "").replace("..", "");
    std::path::Path::new(&name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unnamed")
        .to_string()
}

/// Citations name documents without their extension.
fn document_name(filename: &str) -> String {
    std::path::Path::new(filename)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(filename)
        .to_string()
}
