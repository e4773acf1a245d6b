//! Document ingestion pipeline: file → text → chunks.

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::info;

use crate::chunking::{estimate_tokens, extract_page_number, SentenceChunker};
use crate::file::TextExtractor;
use docsage_core::{DocSageConfig, Error, Result};
use docsage_index::Chunk;

/// Chunks produced from one document plus ingest diagnostics.
#[derive(Debug, Clone)]
pub struct IngestOutput {
    pub chunks: Vec<Chunk>,
    /// Sum of per-chunk token estimates.
    pub total_tokens: usize,
    pub page_count: usize,
    /// SHA-256 of the extracted text, hex encoded.
    pub content_hash: String,
}

/// Turns documents into index-ready chunks.
#[derive(Debug, Clone, Copy)]
pub struct Ingester {
    chunker: SentenceChunker,
}

impl Ingester {
    pub fn new(chunk_size: usize, overlap: usize) -> Self {
        Self {
            chunker: SentenceChunker::new(chunk_size, overlap),
        }
    }

    pub fn from_config(config: &DocSageConfig) -> Self {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split page-annotated text into chunks with ids `"{document_name}_{i}"`.
    pub fn chunk_text(&self, text: &str, document_name: &str) -> Vec<Chunk> {
        self.chunker
            .split(text)
            .into_iter()
            .enumerate()
            .map(|(ordinal, passage)| Chunk {
                id: Chunk::chunk_id(document_name, ordinal),
                page_number: extract_page_number(&passage),
                token_count: estimate_tokens(&passage),
                document_name: document_name.to_string(),
                text: passage,
            })
            .collect()
    }

    /// Extract and chunk a file. Nothing is stored here. Text that yields no
    /// chunks is an ingest error.
    pub fn ingest_file(
        &self,
        extractor: &dyn TextExtractor,
        path: &Path,
        document_name: &str,
    ) -> Result<IngestOutput> {
        let extracted = extractor.extract(path)?;
        let chunks = self.chunk_text(&extracted.text, document_name);
        if chunks.is_empty() {
            return Err(Error::Ingest(format!("{document_name} produced no chunks")));
        }
        let total_tokens = chunks.iter().map(|c| c.token_count).sum();
        let content_hash = content_hash(&extracted.text);

        info!(
            "Ingested {}: {} pages, {} chunks, ~{} tokens (sha256 {})",
            document_name,
            extracted.page_count,
            chunks.len(),
            total_tokens,
            &content_hash[..12]
        );

        Ok(IngestOutput {
            chunks,
            total_tokens,
            page_count: extracted.page_count,
            content_hash,
        })
    }
}

/// Compute SHA-256 hash of text content.
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}
