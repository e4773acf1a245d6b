//! The generation collaborator and the construction-time choice of backend.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::config::{LLMConfig, ResolvedProvider};
use crate::error::GenerationError;
use crate::fallback::LocalSynthesizer;
use crate::providers::{stream_llm, Sampling, StreamChunk};
use crate::types::{ChatMessage, LLMProvider};

/// Turns a prompt into answer text.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Short identifier used in logs and status output.
    fn name(&self) -> String;

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// A hosted provider reached over HTTP.
pub struct HttpGenerator {
    client: Client,
    provider: LLMProvider,
    model: String,
    api_key: String,
    sampling: Sampling,
}

impl HttpGenerator {
    pub fn new(resolved: ResolvedProvider, temperature: f64, max_tokens: usize) -> Self {
        Self {
            client: Client::new(),
            provider: resolved.provider,
            model: resolved.model,
            api_key: resolved.api_key,
            sampling: Sampling {
                temperature,
                max_tokens,
            },
        }
    }

    pub fn provider(&self) -> LLMProvider {
        self.provider
    }
}

#[async_trait]
impl Generator for HttpGenerator {
    fn name(&self) -> String {
        format!("{}:{}", self.provider, self.model)
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let mut stream = stream_llm(
            &self.client,
            self.provider,
            vec![ChatMessage::user(prompt)],
            &self.model,
            &self.api_key,
            self.sampling,
        );

        let mut answer = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                StreamChunk::Token(t) => answer.push_str(&t),
                StreamChunk::Done { tokens_used } => {
                    debug!("{} streamed {} chunks", self.provider, tokens_used);
                    break;
                }
                StreamChunk::Error(e) => return Err(e),
            }
        }

        if answer.trim().is_empty() {
            return Err(GenerationError::Failed(format!(
                "{} returned an empty answer",
                self.provider
            )));
        }
        Ok(answer)
    }
}

/// How answers are produced, fixed at construction.
#[derive(Clone)]
pub enum GenerationBackend {
    /// A prompt-driven generator, with local synthesis on transient failure.
    Remote(Arc<dyn Generator>),
    /// No provider configured: answers are synthesized from the passages.
    Local(LocalSynthesizer),
}

impl GenerationBackend {
    /// Pick the backend from provider configuration.
    pub fn from_config(config: &LLMConfig) -> Self {
        match config.resolve_provider() {
            Some(resolved) => {
                info!(
                    "Answer generation via {} ({})",
                    resolved.provider, resolved.model
                );
                Self::Remote(Arc::new(HttpGenerator::new(
                    resolved,
                    config.temperature,
                    config.max_tokens,
                )))
            }
            None => {
                info!("No LLM API key configured; answers are synthesized locally");
                Self::Local(LocalSynthesizer)
            }
        }
    }

    pub fn name(&self) -> String {
        match self {
            Self::Remote(g) => g.name(),
            Self::Local(_) => "local".to_string(),
        }
    }
}

impl std::fmt::Debug for GenerationBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GenerationBackend({})", self.name())
    }
}
