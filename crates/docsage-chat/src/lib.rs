//! DocSage Chat — answer generation.
//!
//! A `Generator` turns a prompt into text and may fail with a classified
//! `GenerationError`. `HttpGenerator` streams from a hosted provider;
//! `LocalSynthesizer` builds a deterministic answer from retrieved passages
//! and doubles as the fallback when a provider is rate limited or times out.
//! Which one answers is decided once, from `LLMConfig`.

pub mod config;
pub mod error;
pub mod fallback;
pub mod generator;
pub mod prompt;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use error::{classify_failure, GenerationError};
pub use fallback::{LocalSynthesizer, NO_INFORMATION};
pub use generator::{GenerationBackend, Generator, HttpGenerator};
pub use prompt::build_prompt;
pub use types::{ChatMessage, LLMProvider};
