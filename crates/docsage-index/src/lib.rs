//! DocSage Index — passage store with pluggable vectorization.
//!
//! `SimilarityIndex` owns every ingested `Chunk` and answers nearest-neighbour
//! text queries. The vector space is supplied by a `RetrievalBackend`, chosen
//! once at construction: lexical TF-IDF or dense sentence embeddings. Every
//! `add_chunks` re-fits the model over the whole corpus, so scores from before
//! an addition must not be reused after it.

pub mod index;
pub mod stopwords;
pub mod tfidf;
pub mod types;
pub mod vectorizer;

pub use index::SimilarityIndex;
pub use tfidf::{TfidfParams, TfidfVectorizer};
pub use types::{Chunk, SearchResult};
pub use vectorizer::{EmbeddingVectorizer, RetrievalBackend, Vectorizer};
