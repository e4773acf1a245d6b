//! Vectorization strategies behind the similarity index.

use std::sync::Arc;

use docsage_core::{DocSageConfig, RetrievalMode, Result};
use docsage_infer::{create_embedder, EmbedderBackend, QueryCache};
use ndarray::Array1;

use crate::tfidf::{TfidfParams, TfidfVectorizer};

/// Maps texts into a vector space where cosine similarity means relevance.
pub trait Vectorizer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Fit on `texts` (replacing any earlier fit) and return their vectors.
    fn fit_transform(&mut self, texts: &[&str]) -> Result<Vec<Array1<f32>>>;

    /// Vectorize a single text under the current fit.
    fn transform(&self, text: &str) -> Result<Array1<f32>>;

    fn reset(&mut self);
}

impl Vectorizer for TfidfVectorizer {
    fn name(&self) -> &'static str {
        "tfidf"
    }

    fn fit_transform(&mut self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
        Ok(TfidfVectorizer::fit_transform(self, texts))
    }

    fn transform(&self, text: &str) -> Result<Array1<f32>> {
        Ok(TfidfVectorizer::transform(self, text))
    }

    fn reset(&mut self) {
        TfidfVectorizer::reset(self);
    }
}

/// Dense vectors from an embedding model. Fitting is stateless: embeddings do
/// not depend on the rest of the corpus.
pub struct EmbeddingVectorizer {
    embedder: Arc<dyn EmbedderBackend>,
    cache: Arc<QueryCache>,
}

impl EmbeddingVectorizer {
    pub fn new(embedder: Arc<dyn EmbedderBackend>, cache: Arc<QueryCache>) -> Self {
        Self { embedder, cache }
    }
}

impl Vectorizer for EmbeddingVectorizer {
    fn name(&self) -> &'static str {
        self.embedder.name()
    }

    fn fit_transform(&mut self, texts: &[&str]) -> Result<Vec<Array1<f32>>> {
        Ok(self
            .embedder
            .embed_batch(texts)?
            .into_iter()
            .map(|r| r.embedding)
            .collect())
    }

    fn transform(&self, text: &str) -> Result<Array1<f32>> {
        if let Some(embedding) = self.cache.get(text) {
            return Ok(embedding);
        }
        let embedding = self.embedder.embed(text)?.embedding;
        self.cache.put(text.to_string(), embedding.clone());
        Ok(embedding)
    }

    fn reset(&mut self) {}
}

/// The retrieval strategy, chosen once at construction.
#[derive(Clone)]
pub enum RetrievalBackend {
    Lexical,
    Dense {
        embedder: Arc<dyn EmbedderBackend>,
        cache: Arc<QueryCache>,
    },
}

impl RetrievalBackend {
    pub fn dense(embedder: Arc<dyn EmbedderBackend>) -> Self {
        Self::Dense {
            embedder,
            cache: Arc::new(QueryCache::default()),
        }
    }

    /// Build the backend named by configuration. A dense backend whose
    /// embedder cannot be loaded is an error.
    pub fn from_config(config: &DocSageConfig) -> Result<Self> {
        match config.retrieval_mode {
            RetrievalMode::Lexical => Ok(Self::Lexical),
            RetrievalMode::Dense => {
                let embedder = create_embedder(
                    config.embedder,
                    &config.data_paths.models,
                    config.embedding_dim,
                )?;
                Ok(Self::dense(embedder))
            }
        }
    }

    pub fn mode(&self) -> RetrievalMode {
        match self {
            Self::Lexical => RetrievalMode::Lexical,
            Self::Dense { .. } => RetrievalMode::Dense,
        }
    }

    /// A fresh vectorizer for the index.
    pub fn index_vectorizer(&self) -> Box<dyn Vectorizer> {
        match self {
            Self::Lexical => Box::new(TfidfVectorizer::new(TfidfParams::retrieval())),
            Self::Dense { embedder, cache } => {
                Box::new(EmbeddingVectorizer::new(embedder.clone(), cache.clone()))
            }
        }
    }

    /// A fresh vectorizer for re-ranking comparisons.
    pub fn comparison_vectorizer(&self) -> Box<dyn Vectorizer> {
        match self {
            Self::Lexical => Box::new(TfidfVectorizer::new(TfidfParams::rerank())),
            Self::Dense { embedder, cache } => {
                Box::new(EmbeddingVectorizer::new(embedder.clone(), cache.clone()))
            }
        }
    }

    /// Results scoring at or below this are never returned.
    pub fn min_score(&self) -> f32 {
        0.0
    }
}

impl std::fmt::Debug for RetrievalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexical => write!(f, "Lexical"),
            Self::Dense { embedder, .. } => write!(f, "Dense({})", embedder.name()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsage_infer::HashEmbedder;

    #[test]
    fn test_mode_reports_strategy() {
        assert_eq!(RetrievalBackend::Lexical.mode(), RetrievalMode::Lexical);
        let dense = RetrievalBackend::dense(Arc::new(HashEmbedder::new(32)));
        assert_eq!(dense.mode(), RetrievalMode::Dense);
        assert_eq!(dense.index_vectorizer().name(), "hash");
    }

    #[test]
    fn test_embedding_transform_uses_cache() {
        let cache = Arc::new(QueryCache::default());
        let v = EmbeddingVectorizer::new(Arc::new(HashEmbedder::new(32)), cache.clone());
        let first = v.transform("quarterly revenue").unwrap();
        let second = v.transform("quarterly revenue").unwrap();
        assert_eq!(first, second);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_from_config_lexical_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = DocSageConfig::with_defaults(dir.path()).unwrap();
        let backend = RetrievalBackend::from_config(&config).unwrap();
        assert_eq!(backend.mode(), RetrievalMode::Lexical);
    }
}
