//! Configuration and data directory management.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_CHUNK_SIZE: usize = 400;
pub const DEFAULT_CHUNK_OVERLAP: usize = 80;
pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.2;
pub const DEFAULT_MMR_LAMBDA: f64 = 0.5;
pub const DEFAULT_MAX_SHORT_TERM: usize = 10;
pub const DEFAULT_MAX_LONG_TERM: usize = 100;
pub const DEFAULT_EMBEDDING_DIM: usize = 384;
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 30;

/// Paths to all DocSage data files and directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Uploaded source documents (`data/uploads/`).
    pub uploads: PathBuf,
    /// Embedding model files for the dense backend (`data/models/`).
    pub models: PathBuf,
    /// Durable conversation log (`data/conversation_history.json`).
    pub conversation_file: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            uploads: root.join("uploads"),
            models: root.join("models"),
            conversation_file: root.join("conversation_history.json"),
            llm_config_file: root.join("llm-config.json"),
            root,
        };
        paths.ensure_dirs()?;
        Ok(paths)
    }

    fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.root)?;
        std::fs::create_dir_all(&self.uploads)?;
        std::fs::create_dir_all(&self.models)?;
        Ok(())
    }
}

/// Which vectorization strategy backs the similarity index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalMode {
    /// TF-IDF over word unigrams and bigrams.
    Lexical,
    /// Sentence embeddings from an `EmbedderBackend`.
    Dense,
}

impl std::fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lexical => write!(f, "lexical"),
            Self::Dense => write!(f, "dense"),
        }
    }
}

impl FromStr for RetrievalMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "lexical" | "tfidf" => Ok(Self::Lexical),
            "dense" | "embedding" | "embeddings" => Ok(Self::Dense),
            other => Err(Error::Config(format!("unknown retrieval mode: {other}"))),
        }
    }
}

/// Which embedding model serves the dense backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedderKind {
    /// Signed feature hashing; always available.
    Hash,
    /// ONNX sentence-transformer model loaded from `models/`.
    Onnx,
}

impl std::fmt::Display for EmbedderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash => write!(f, "hash"),
            Self::Onnx => write!(f, "onnx"),
        }
    }
}

impl FromStr for EmbedderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "hash" | "hashing" => Ok(Self::Hash),
            "onnx" => Ok(Self::Onnx),
            other => Err(Error::Config(format!("unknown embedder: {other}"))),
        }
    }
}

/// Top-level DocSage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocSageConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    /// Target chunk size in estimated tokens.
    pub chunk_size: usize,
    /// Overlap parameter handed to the chunker.
    pub chunk_overlap: usize,
    /// Number of passages retrieved per query.
    pub top_k: usize,
    /// Below this confidence an empty retrieval is answered with the upload prompt.
    pub confidence_threshold: f64,
    /// MMR trade-off: 1.0 is pure relevance, 0.0 pure diversity.
    pub mmr_lambda: f64,
    /// Recent-window size per conversation.
    pub max_short_term: usize,
    /// Durable log cap per conversation.
    pub max_long_term: usize,
    pub retrieval_mode: RetrievalMode,
    /// Embedding model used when `retrieval_mode` is dense.
    pub embedder: EmbedderKind,
    /// Dimension of the dense embedding space.
    pub embedding_dim: usize,
    /// Upper bound on a single generation call.
    pub generation_timeout: Duration,
    /// Whether ingesting a document replaces the current corpus.
    pub clear_on_ingest: bool,
}

impl DocSageConfig {
    /// Create configuration with all defaults under the given data directory.
    pub fn with_defaults(data_dir: impl AsRef<Path>) -> std::io::Result<Self> {
        Ok(Self {
            port: DEFAULT_PORT,
            data_paths: DataPaths::new(data_dir)?,
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_overlap: DEFAULT_CHUNK_OVERLAP,
            top_k: DEFAULT_TOP_K,
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            mmr_lambda: DEFAULT_MMR_LAMBDA,
            max_short_term: DEFAULT_MAX_SHORT_TERM,
            max_long_term: DEFAULT_MAX_LONG_TERM,
            retrieval_mode: RetrievalMode::Lexical,
            embedder: EmbedderKind::Hash,
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            generation_timeout: Duration::from_secs(DEFAULT_GENERATION_TIMEOUT_SECS),
            clear_on_ingest: true,
        })
    }

    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary key lookup.
    ///
    /// Unparseable numeric values fall back to their defaults; an unknown
    /// retrieval mode is a configuration error.
    pub fn from_lookup<F>(data_dir: impl AsRef<Path>, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::with_defaults(data_dir)?;

        let parsed = |key: &str| lookup(key).map(|v| v.trim().to_string());

        if let Some(port) = parsed("PORT").and_then(|v| v.parse().ok()) {
            config.port = port;
        }
        if let Some(size) = parsed("CHUNK_SIZE").and_then(|v| v.parse().ok()) {
            config.chunk_size = size;
        }
        if let Some(overlap) = parsed("CHUNK_OVERLAP").and_then(|v| v.parse().ok()) {
            config.chunk_overlap = overlap;
        }
        if let Some(top_k) = parsed("TOP_K_RETRIEVAL").and_then(|v| v.parse().ok()) {
            config.top_k = top_k;
        }
        if let Some(threshold) = parsed("CONFIDENCE_THRESHOLD").and_then(|v| v.parse().ok()) {
            config.confidence_threshold = threshold;
        }
        if let Some(lambda) = parsed("MMR_LAMBDA").and_then(|v| v.parse::<f64>().ok()) {
            config.mmr_lambda = lambda.clamp(0.0, 1.0);
        }
        if let Some(s) = parsed("MAX_SHORT_TERM").and_then(|v| v.parse().ok()) {
            config.max_short_term = s;
        }
        if let Some(l) = parsed("MAX_LONG_TERM").and_then(|v| v.parse().ok()) {
            config.max_long_term = l;
        }
        if let Some(mode) = parsed("RETRIEVAL_MODE") {
            config.retrieval_mode = mode.parse()?;
        }
        if let Some(kind) = parsed("EMBEDDER") {
            config.embedder = kind.parse()?;
        }
        if let Some(dim) = parsed("EMBEDDING_DIM").and_then(|v| v.parse().ok()) {
            config.embedding_dim = dim;
        }
        if let Some(secs) = parsed("GENERATION_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            config.generation_timeout = Duration::from_secs(secs);
        }
        if let Some(flag) = parsed("CLEAR_ON_INGEST") {
            config.clear_on_ingest = !matches!(flag.to_lowercase().as_str(), "0" | "false" | "no");
        }

        config.normalize();
        Ok(config)
    }

    /// Enforce cross-field invariants.
    fn normalize(&mut self) {
        self.max_short_term = self.max_short_term.max(1);
        if self.max_long_term < self.max_short_term {
            tracing::warn!(
                "MAX_LONG_TERM ({}) below MAX_SHORT_TERM ({}); raising it",
                self.max_long_term,
                self.max_short_term
            );
            self.max_long_term = self.max_short_term;
        }
        self.chunk_size = self.chunk_size.max(1);
        self.embedding_dim = self.embedding_dim.max(1);
        self.top_k = self.top_k.max(1);
    }
}
