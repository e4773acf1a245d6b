//! DocSage Rerank — reorders search results for diversity.

pub mod mmr;

pub use mmr::{MmrReranker, Reranker};
