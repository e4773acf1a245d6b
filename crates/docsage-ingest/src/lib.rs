//! DocSage Ingest — text extraction, sentence chunking, chunk construction.
//!
//! Ingestion turns a source file into page-annotated text (`[PAGE n]`
//! markers), splits it into overlapping sentence-aligned passages, and wraps
//! each passage as a `Chunk` ready for the similarity index.

pub mod chunking;
pub mod file;
pub mod ingest;

pub use chunking::{estimate_tokens, extract_page_number, split_sentences, SentenceChunker};
pub use file::{annotate_pages, DocumentExtractor, ExtractedText, PlainTextExtractor, TextExtractor};
pub use ingest::{content_hash, IngestOutput, Ingester};

#[cfg(feature = "pdf")]
pub use file::PdfExtractor;
