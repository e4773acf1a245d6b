//! Passage and search-hit types.

use serde::{Deserialize, Serialize};

/// A bounded passage of document text with its provenance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Unique within an index; `"{document_name}_{ordinal}"`.
    pub id: String,
    pub text: String,
    pub document_name: String,
    /// 1-based page the passage was taken from.
    pub page_number: u32,
    /// Estimated token count, at least 1.
    pub token_count: usize,
}

impl Chunk {
    pub fn chunk_id(document_name: &str, ordinal: usize) -> String {
        format!("{document_name}_{ordinal}")
    }
}

/// A chunk returned by a search, with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub chunk: Chunk,
    /// Higher is more relevant. The range depends on the backend.
    pub score: f32,
}

impl SearchResult {
    pub fn text(&self) -> &str {
        &self.chunk.text
    }
}
