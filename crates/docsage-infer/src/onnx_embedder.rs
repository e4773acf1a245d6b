//! Sentence-transformer embeddings through ONNX Runtime.
//!
//! Expects `model.onnx` and `tokenizer.json` (all-MiniLM-L6-v2 layout) in the
//! model directory. Requires the `onnx` feature.

#[cfg(feature = "onnx")]
mod inner {
    use std::path::Path;

    use docsage_core::{Error, Result};
    use ndarray::Array1;
    use ort::session::Session;
    use ort::value::Tensor;
    use parking_lot::Mutex;
    use tokenizers::Tokenizer;
    use tracing::info;

    use crate::cache::QueryCache;
    use crate::embedder::{EmbedderBackend, EmbeddingResult};

    const MAX_SEQ_LEN: usize = 256;
    const DEFAULT_DIM: usize = 384;

    /// Truncated token ids and attention mask for a single input.
    struct Encoded {
        ids: Vec<i64>,
        mask: Vec<i64>,
    }

    pub struct OnnxEmbedder {
        session: Mutex<Session>,
        tokenizer: Tokenizer,
        cache: QueryCache,
        dimension: usize,
    }

    impl OnnxEmbedder {
        pub fn load(model_dir: &Path) -> Result<Self> {
            let model_path = model_dir.join("model.onnx");
            let tokenizer_path = model_dir.join("tokenizer.json");

            for required in [&model_path, &tokenizer_path] {
                if !required.exists() {
                    return Err(Error::Inference(format!(
                        "missing model file: {}",
                        required.display()
                    )));
                }
            }

            ort::init().commit();

            let session = Session::builder()
                .map_err(|e| Error::Inference(format!("failed to create session builder: {e}")))?
                .with_intra_threads(2)
                .map_err(|e| Error::Inference(format!("failed to configure session: {e}")))?
                .commit_from_file(&model_path)
                .map_err(|e| Error::Inference(format!("failed to load ONNX model: {e}")))?;

            let tokenizer = Tokenizer::from_file(&tokenizer_path)
                .map_err(|e| Error::Inference(format!("failed to load tokenizer: {e}")))?;

            info!("ONNX embedder loaded from {}", model_path.display());

            Ok(Self {
                session: Mutex::new(session),
                tokenizer,
                cache: QueryCache::default(),
                dimension: DEFAULT_DIM,
            })
        }

        fn encode(&self, text: &str) -> Result<Encoded> {
            let encoding = self
                .tokenizer
                .encode(text, true)
                .map_err(|e| Error::Inference(format!("tokenization failed: {e}")))?;

            let len = encoding.get_ids().len().min(MAX_SEQ_LEN);
            Ok(Encoded {
                ids: encoding.get_ids()[..len].iter().map(|&id| id as i64).collect(),
                mask: encoding.get_attention_mask()[..len]
                    .iter()
                    .map(|&m| m as i64)
                    .collect(),
            })
        }

        fn run(&self, encoded: &Encoded) -> Result<Array1<f32>> {
            let len = encoded.ids.len();
            let tensor = |data: Vec<i64>| {
                Tensor::from_array(([1usize, len], data))
                    .map_err(|e| Error::Inference(format!("tensor construction failed: {e}")))
            };
            let ids = tensor(encoded.ids.clone())?;
            let mask = tensor(encoded.mask.clone())?;
            let type_ids = tensor(vec![0i64; len])?;

            let mut session = self.session.lock();
            let outputs = session
                .run(ort::inputs![ids, mask, type_ids])
                .map_err(|e| Error::Inference(format!("inference failed: {e}")))?;

            let (shape, data) = outputs[0]
                .try_extract_tensor::<f32>()
                .map_err(|e| Error::Inference(format!("unexpected model output: {e}")))?;
            let dims: Vec<i64> = shape.iter().copied().collect();

            match dims.as_slice() {
                // [1, seq_len, dim]: token embeddings, mean-pool under the mask.
                [_, seq, dim] => Ok(mean_pool(data, &encoded.mask, *seq as usize, *dim as usize)),
                // [1, dim]: already pooled.
                [_, dim] => Ok(Array1::from_vec(data[..*dim as usize].to_vec())),
                other => Err(Error::Inference(format!("unexpected output shape {other:?}"))),
            }
        }
    }

    fn mean_pool(data: &[f32], mask: &[i64], seq: usize, dim: usize) -> Array1<f32> {
        let mut pooled = Array1::<f32>::zeros(dim);
        let mut weight = 0.0f32;
        for (i, &m) in mask.iter().take(seq).enumerate() {
            if m == 0 {
                continue;
            }
            weight += 1.0;
            let row = &data[i * dim..(i + 1) * dim];
            for (p, v) in pooled.iter_mut().zip(row) {
                *p += v;
            }
        }
        if weight > 0.0 {
            pooled /= weight;
        }
        let norm = pooled.dot(&pooled).sqrt();
        if norm > 0.0 {
            pooled /= norm;
        }
        pooled
    }

    impl EmbedderBackend for OnnxEmbedder {
        fn name(&self) -> &'static str {
            "onnx"
        }

        fn embed(&self, text: &str) -> Result<EmbeddingResult> {
            if let Some(embedding) = self.cache.get(text) {
                return Ok(EmbeddingResult {
                    embedding,
                    cached: true,
                });
            }

            let embedding = self.run(&self.encode(text)?)?;
            self.cache.put(text.to_string(), embedding.clone());
            Ok(EmbeddingResult {
                embedding,
                cached: false,
            })
        }

        fn dimension(&self) -> usize {
            self.dimension
        }
    }
}

#[cfg(feature = "onnx")]
pub use inner::OnnxEmbedder;
