//! Pipeline result types.

use docsage_answer::Citation;
use serde::{Deserialize, Serialize};

/// Conversation used when a query names none.
pub const DEFAULT_CONVERSATION_ID: &str = "default";

/// Answer given when there is nothing to retrieve from.
pub const UPLOAD_PROMPT: &str =
    "Please upload a document first, then ask questions about its content.";

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub document_name: String,
    pub chunks_created: usize,
    pub total_tokens: usize,
    pub page_count: usize,
    pub content_hash: String,
}

/// Answer to a query. Always well formed, even when the pipeline failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerResult {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub confidence: f64,
    /// Passages handed to generation.
    #[serde(rename = "retrieved_chunks")]
    pub retrieved_count: usize,
}

impl AnswerResult {
    /// A failed query: no citations, zero confidence.
    pub fn degraded(answer: impl Into<String>, retrieved_count: usize) -> Self {
        Self {
            answer: answer.into(),
            citations: Vec::new(),
            confidence: 0.0,
            retrieved_count,
        }
    }
}

/// Snapshot of orchestrator state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeStatus {
    pub chunks: usize,
    pub index_fitted: bool,
    pub retrieval_mode: String,
    pub generator: String,
    pub conversations: usize,
}
