//! Classified generation failures.

use thiserror::Error;

/// Why a generation call produced no answer.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerationError {
    /// Provider throttled the request or the quota is spent.
    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("generation failed: {0}")]
    Failed(String),
}

impl GenerationError {
    /// Transient failures are answered by local synthesis instead.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::Timeout(_))
    }
}

impl From<GenerationError> for docsage_core::Error {
    fn from(e: GenerationError) -> Self {
        docsage_core::Error::Generation(e.to_string())
    }
}

/// Translate a raw provider failure into a `GenerationError`.
///
/// `status` is the HTTP status when one was received; `message` is the
/// response body or transport error text.
pub fn classify_failure(status: Option<u16>, message: &str) -> GenerationError {
    let lower = message.to_lowercase();
    let message = message.to_string();

    if status == Some(429)
        || lower.contains("quota")
        || lower.contains("rate limit")
        || lower.contains("rate_limit")
    {
        return GenerationError::RateLimited(message);
    }
    if matches!(status, Some(408) | Some(504)) || lower.contains("timed out") {
        return GenerationError::Timeout(message);
    }
    GenerationError::Failed(message)
}
