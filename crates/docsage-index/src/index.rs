//! In-memory passage store with full re-fit on every addition.

use std::cmp::Ordering;
use std::collections::HashSet;

use docsage_core::{Error, RetrievalMode, Result};
use docsage_infer::cosine_similarity;
use ndarray::Array1;
use tracing::{debug, info};

use crate::types::{Chunk, SearchResult};
use crate::vectorizer::{RetrievalBackend, Vectorizer};

pub struct SimilarityIndex {
    backend: RetrievalBackend,
    vectorizer: Box<dyn Vectorizer>,
    chunks: Vec<Chunk>,
    vectors: Vec<Array1<f32>>,
    fitted: bool,
}

impl SimilarityIndex {
    pub fn new(backend: RetrievalBackend) -> Self {
        let vectorizer = backend.index_vectorizer();
        Self {
            backend,
            vectorizer,
            chunks: Vec::new(),
            vectors: Vec::new(),
            fitted: false,
        }
    }

    pub fn backend(&self) -> &RetrievalBackend {
        &self.backend
    }

    pub fn mode(&self) -> RetrievalMode {
        self.backend.mode()
    }

    /// Drop all chunks and the fitted model.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.vectors.clear();
        self.vectorizer.reset();
        self.fitted = false;
        debug!("Similarity index cleared");
    }

    /// Append `chunks` and re-fit the model over the entire corpus.
    ///
    /// Ids must be unique across the index. On error the index is unchanged.
    pub fn add_chunks(&mut self, chunks: Vec<Chunk>) -> Result<usize> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let mut ids: HashSet<&str> = self.chunks.iter().map(|c| c.id.as_str()).collect();
        for chunk in &chunks {
            if !ids.insert(chunk.id.as_str()) {
                return Err(Error::Index(format!("duplicate chunk id: {}", chunk.id)));
            }
        }

        let mut vectorizer = self.backend.index_vectorizer();
        let texts: Vec<&str> = self
            .chunks
            .iter()
            .chain(chunks.iter())
            .map(|c| c.text.as_str())
            .collect();
        let vectors = vectorizer.fit_transform(&texts)?;

        let added = chunks.len();
        self.chunks.extend(chunks);
        self.vectors = vectors;
        self.vectorizer = vectorizer;
        self.fitted = true;

        info!(
            "Index re-fit with {} chunks ({} added, {})",
            self.chunks.len(),
            added,
            self.vectorizer.name()
        );
        Ok(added)
    }

    /// Return up to `top_k` chunks most similar to `query`, best first.
    ///
    /// Ties keep insertion order. Results at or below the backend floor are
    /// dropped. An empty or unfitted index yields no results.
    pub fn search(&self, query: &str, top_k: usize) -> Result<Vec<SearchResult>> {
        if !self.fitted || self.chunks.is_empty() || top_k == 0 {
            return Ok(Vec::new());
        }

        let query_vec = self.vectorizer.transform(query)?;
        let floor = self.backend.min_score();

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(&query_vec, v)))
            .filter(|(_, score)| *score > floor)
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
        scored.truncate(top_k);

        debug!("Search returned {} of {} chunks", scored.len(), self.chunks.len());
        Ok(scored
            .into_iter()
            .map(|(i, score)| SearchResult {
                chunk: self.chunks[i].clone(),
                score,
            })
            .collect())
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }
}
