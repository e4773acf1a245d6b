//! Maximal marginal relevance.
//!
//! Relevance is recomputed in a comparison space fitted over the query and the
//! candidates only, independent of the scores the index produced.

use docsage_core::config::DEFAULT_MMR_LAMBDA;
use docsage_core::Result;
use docsage_infer::cosine_similarity;
use docsage_index::{RetrievalBackend, SearchResult};
use tracing::debug;

/// Re-scores and reorders search results.
pub trait Reranker: Send + Sync {
    /// Returns a permutation of `results`.
    fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>>;
}

pub struct MmrReranker {
    backend: RetrievalBackend,
    lambda: f64,
}

impl MmrReranker {
    /// `lambda` is clamped to `[0, 1]`; 1 is pure relevance, 0 pure diversity.
    pub fn new(backend: RetrievalBackend, lambda: f64) -> Self {
        Self {
            backend,
            lambda: lambda.clamp(0.0, 1.0),
        }
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn rerank_with_lambda(
        &self,
        query: &str,
        results: Vec<SearchResult>,
        lambda: f64,
    ) -> Result<Vec<SearchResult>> {
        if results.len() <= 1 {
            return Ok(results);
        }
        let lambda = lambda.clamp(0.0, 1.0) as f32;

        let mut texts: Vec<&str> = Vec::with_capacity(results.len() + 1);
        texts.push(query);
        texts.extend(results.iter().map(|r| r.text()));
        let mut vectorizer = self.backend.comparison_vectorizer();
        let vectors = vectorizer.fit_transform(&texts)?;
        let (query_vec, candidates) = vectors.split_first().ok_or_else(|| {
            docsage_core::Error::Internal("comparison vectorizer returned no rows".into())
        })?;

        let relevance: Vec<f32> = candidates
            .iter()
            .map(|c| cosine_similarity(c, query_vec))
            .collect();

        let mut remaining: Vec<usize> = (0..results.len()).collect();
        let mut selected: Vec<usize> = Vec::with_capacity(results.len());

        let first = argmax(remaining.iter().map(|&i| relevance[i]));
        selected.push(remaining.remove(first));

        while !remaining.is_empty() {
            let scores = remaining.iter().map(|&i| {
                let redundancy = selected
                    .iter()
                    .map(|&s| cosine_similarity(&candidates[i], &candidates[s]))
                    .fold(f32::NEG_INFINITY, f32::max);
                lambda * relevance[i] - (1.0 - lambda) * redundancy
            });
            let best = argmax(scores);
            selected.push(remaining.remove(best));
        }

        debug!("MMR order (lambda={}): {:?}", lambda, selected);

        let mut slots: Vec<Option<SearchResult>> = results.into_iter().map(Some).collect();
        Ok(selected
            .into_iter()
            .filter_map(|i| slots[i].take())
            .collect())
    }
}

impl Default for MmrReranker {
    fn default() -> Self {
        Self::new(RetrievalBackend::Lexical, DEFAULT_MMR_LAMBDA)
    }
}

impl Reranker for MmrReranker {
    fn rerank(&self, query: &str, results: Vec<SearchResult>) -> Result<Vec<SearchResult>> {
        self.rerank_with_lambda(query, results, self.lambda)
    }
}

/// Position of the largest value; the first one wins ties.
fn argmax(values: impl Iterator<Item = f32>) -> usize {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, v) in values.enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsage_index::Chunk;
    use docsage_infer::HashEmbedder;
    use std::sync::Arc;

    fn result(id: &str, text: &str, score: f32) -> SearchResult {
        SearchResult {
            chunk: Chunk {
                id: id.to_string(),
                text: text.to_string(),
                document_name: "doc".to_string(),
                page_number: 1,
                token_count: 1,
            },
            score,
        }
    }

    fn candidates() -> Vec<SearchResult> {
        vec![
            result("a", "solar energy panels rooftop", 0.9),
            result("b", "solar energy panels rooftop install", 0.8),
            result("c", "solar energy storage batteries grid", 0.7),
        ]
    }

    fn ids(results: &[SearchResult]) -> Vec<&str> {
        results.iter().map(|r| r.chunk.id.as_str()).collect()
    }

    #[test]
    fn test_single_result_unchanged() {
        let reranker = MmrReranker::default();
        let one = vec![result("a", "anything", 0.1)];
        assert_eq!(reranker.rerank("q", one.clone()).unwrap(), one);
        assert!(reranker.rerank("q", Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_output_is_permutation() {
        let reranker = MmrReranker::default();
        for lambda in [0.0, 0.3, 0.5, 0.8, 1.0] {
            let out = reranker
                .rerank_with_lambda("solar energy", candidates(), lambda)
                .unwrap();
            let mut got = ids(&out);
            got.sort();
            assert_eq!(got, vec!["a", "b", "c"]);
        }
    }

    #[test]
    fn test_lambda_one_is_relevance_order() {
        let reranker = MmrReranker::new(RetrievalBackend::Lexical, 1.0);
        let out = reranker.rerank("solar energy", candidates()).unwrap();
        assert_eq!(ids(&out), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_diverse_passage_beats_near_duplicate() {
        let reranker = MmrReranker::new(RetrievalBackend::Lexical, 0.5);
        let out = reranker.rerank("solar energy", candidates()).unwrap();
        assert_eq!(ids(&out), vec!["a", "c", "b"]);
    }

    #[test]
    fn test_scores_preserved() {
        let reranker = MmrReranker::default();
        let out = reranker.rerank("solar energy", candidates()).unwrap();
        let b = out.iter().find(|r| r.chunk.id == "b").unwrap();
        assert_eq!(b.score, 0.8);
    }

    #[test]
    fn test_dense_comparison_space() {
        let backend = RetrievalBackend::dense(Arc::new(HashEmbedder::new(128)));
        let reranker = MmrReranker::new(backend, 0.5);
        let out = reranker.rerank("solar energy", candidates()).unwrap();
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_argmax_first_wins_ties() {
        assert_eq!(argmax([0.2, 0.5, 0.5].into_iter()), 1);
        assert_eq!(argmax([0.0, 0.0].into_iter()), 0);
    }
}
