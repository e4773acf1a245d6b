//! DocSage Runtime — the ingest and query pipelines.

pub mod orchestrator;
pub mod types;

pub use orchestrator::Orchestrator;
pub use types::{AnswerResult, IngestReport, RuntimeStatus, DEFAULT_CONVERSATION_ID, UPLOAD_PROMPT};
