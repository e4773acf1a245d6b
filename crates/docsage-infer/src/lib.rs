//! DocSage Infer — dense embedding backends and query cache.
//!
//! `EmbedderBackend` abstracts embedding generation. `HashEmbedder` is a
//! deterministic, model-free backend that is always compiled in. With the
//! `onnx` feature, `OnnxEmbedder` loads a sentence-transformer model from disk.
//! The backend is chosen once from configuration; a requested backend that
//! cannot be loaded is an error, never a silent downgrade.

pub mod cache;
pub mod embedder;
pub mod hash_embedder;
pub mod onnx_embedder;

pub use cache::QueryCache;
pub use embedder::{cosine_similarity, EmbedderBackend, EmbeddingResult};
pub use hash_embedder::HashEmbedder;

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;

use docsage_core::{EmbedderKind, Result};

/// Create the embedder named by configuration.
pub fn create_embedder(
    kind: EmbedderKind,
    model_dir: &Path,
    dim: usize,
) -> Result<Arc<dyn EmbedderBackend>> {
    match kind {
        EmbedderKind::Hash => {
            tracing::info!("Using hash embedder (dim={})", dim);
            Ok(Arc::new(HashEmbedder::new(dim)))
        }
        EmbedderKind::Onnx => load_onnx(model_dir),
    }
}

#[cfg(feature = "onnx")]
fn load_onnx(model_dir: &Path) -> Result<Arc<dyn EmbedderBackend>> {
    let embedder = OnnxEmbedder::load(model_dir)?;
    tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
    Ok(Arc::new(embedder))
}

#[cfg(not(feature = "onnx"))]
fn load_onnx(model_dir: &Path) -> Result<Arc<dyn EmbedderBackend>> {
    Err(docsage_core::Error::Config(format!(
        "ONNX embedder requested for {} but the `onnx` feature is disabled",
        model_dir.display()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_hash_embedder() {
        let embedder = create_embedder(EmbedderKind::Hash, Path::new("unused"), 64).unwrap();
        assert_eq!(embedder.dimension(), 64);
        assert_eq!(embedder.name(), "hash");
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_without_feature_is_config_error() {
        let result = create_embedder(EmbedderKind::Onnx, Path::new("models"), 384);
        assert!(matches!(result, Err(docsage_core::Error::Config(_))));
    }
}
