//! DocSage Core — error types and configuration shared by every crate.

pub mod config;
pub mod error;

pub use config::{DataPaths, DocSageConfig, EmbedderKind, RetrievalMode};
pub use error::{Error, Result};
