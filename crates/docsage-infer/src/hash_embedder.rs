//! Model-free dense embeddings via signed feature hashing.
//!
//! Each lower-cased word contributes its unigram and the character trigrams
//! of `#word#` to a fixed-size vector, with the sign taken from the hash.
//! Output is L2-normalised, so dot product equals cosine similarity.

use docsage_core::Result;
use ndarray::Array1;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::embedder::{EmbedderBackend, EmbeddingResult};

static WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\w+").unwrap());

const UNIGRAM_WEIGHT: f32 = 1.0;
const TRIGRAM_WEIGHT: f32 = 0.5;

/// Deterministic hashing embedder.
pub struct HashEmbedder {
    dim: usize,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    fn accumulate(&self, vector: &mut Array1<f32>, feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let slot = (hash % self.dim as u64) as usize;
        let sign = if (hash >> 63) & 1 == 0 { 1.0 } else { -1.0 };
        vector[slot] += sign * weight;
    }
}

impl EmbedderBackend for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn embed(&self, text: &str) -> Result<EmbeddingResult> {
        let mut vector = Array1::<f32>::zeros(self.dim);
        let lower = text.to_lowercase();

        for word in WORD_RE.find_iter(&lower).map(|m| m.as_str()) {
            self.accumulate(&mut vector, word, UNIGRAM_WEIGHT);

            let padded: Vec<char> = std::iter::once('#')
                .chain(word.chars())
                .chain(std::iter::once('#'))
                .collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.accumulate(&mut vector, &trigram, TRIGRAM_WEIGHT);
            }
        }

        let norm = vector.dot(&vector).sqrt();
        if norm > 0.0 {
            vector /= norm;
        }

        Ok(EmbeddingResult {
            embedding: vector,
            cached: false,
        })
    }

    fn dimension(&self) -> usize {
        self.dim
    }
}

/// 64-bit FNV-1a.
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for &b in bytes {
        hash ^= b as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}
