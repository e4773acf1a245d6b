//! External LLM provider streaming implementations.
//!
//! Each provider streams tokens via SSE from its API. OpenAI and Groq share a
//! format; Gemini and Anthropic have their own. Failures are classified at
//! the point they are observed.

use std::pin::Pin;

use futures::Stream;
use reqwest::{Client, RequestBuilder};
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::error::{classify_failure, GenerationError};
use crate::types::{ChatMessage, LLMProvider};

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token or error.
#[derive(Debug)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(GenerationError),
}

/// Sampling settings shared by all providers.
#[derive(Debug, Clone, Copy)]
pub struct Sampling {
    pub temperature: f64,
    pub max_tokens: usize,
}

/// Stream tokens from the appropriate provider.
pub fn stream_llm(
    client: &Client,
    provider: LLMProvider,
    messages: Vec<ChatMessage>,
    model: &str,
    api_key: &str,
    sampling: Sampling,
) -> BoxedStream {
    let model = model.to_string();
    match provider {
        LLMProvider::OpenAI | LLMProvider::Groq => {
            let url = if provider == LLMProvider::OpenAI {
                "https://api.openai.com/v1/chat/completions"
            } else {
                "https://api.groq.com/openai/v1/chat/completions"
            };
            let msgs: Vec<Value> = messages
                .iter()
                .map(|m| json!({"role": m.role, "content": m.content}))
                .collect();
            let body = json!({
                "model": model,
                "messages": msgs,
                "temperature": sampling.temperature,
                "max_tokens": sampling.max_tokens,
                "stream": true,
            });
            let request = client
                .post(url)
                .header("Authorization", format!("Bearer {}", api_key))
                .json(&body);
            debug!("Streaming from {} with model {}", url, model);
            Box::pin(sse_stream(request, openai_event))
        }
        LLMProvider::Anthropic => {
            let system: Option<String> = messages
                .iter()
                .find(|m| m.role == "system")
                .map(|m| m.content.clone());
            let conv: Vec<Value> = messages
                .iter()
                .filter(|m| m.role != "system")
                .map(|m| json!({"role": m.role, "content": m.content}))
                .collect();
            let mut body = json!({
                "model": model,
                "messages": conv,
                "temperature": sampling.temperature,
                "max_tokens": sampling.max_tokens,
                "stream": true,
            });
            if let Some(sys) = system {
                body["system"] = json!(sys);
            }
            let request = client
                .post("https://api.anthropic.com/v1/messages")
                .header("x-api-key", api_key)
                .header("anthropic-version", "2023-06-01")
                .json(&body);
            debug!("Streaming from Anthropic with model {}", model);
            Box::pin(sse_stream(request, anthropic_event))
        }
        LLMProvider::Gemini => {
            let contents: Vec<Value> = messages
                .iter()
                .map(|m| {
                    let role = if m.role == "assistant" { "model" } else { "user" };
                    json!({"role": role, "parts": [{"text": m.content}]})
                })
                .collect();
            let body = json!({
                "contents": contents,
                "generationConfig": {
                    "temperature": sampling.temperature,
                    "maxOutputTokens": sampling.max_tokens,
                },
            });
            let url = format!(
                "https://generativelanguage.googleapis.com/v1beta/models/{}:streamGenerateContent?alt=sse",
                model
            );
            let request = client
                .post(url)
                .header("x-goog-api-key", api_key)
                .json(&body);
            debug!("Streaming from Gemini with model {}", model);
            Box::pin(sse_stream(request, gemini_event))
        }
    }
}

/// What a single SSE `data:` payload means.
enum Event {
    Token(String),
    Stop,
    Error(GenerationError),
    Ignore,
}

fn openai_event(data: &str) -> Event {
    if data.trim() == "[DONE]" {
        return Event::Stop;
    }
    match serde_json::from_str::<Value>(data) {
        Ok(parsed) => {
            if let Some(err) = parsed.get("error") {
                let msg = err["message"].as_str().unwrap_or("Unknown error");
                return Event::Error(classify_failure(None, msg));
            }
            match parsed["choices"][0]["delta"]["content"].as_str() {
                Some(content) if !content.is_empty() => Event::Token(content.to_string()),
                _ => Event::Ignore,
            }
        }
        Err(_) => Event::Ignore,
    }
}

fn anthropic_event(data: &str) -> Event {
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return Event::Ignore;
    };
    match parsed["type"].as_str() {
        Some("content_block_delta") => match parsed["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => Event::Token(text.to_string()),
            _ => Event::Ignore,
        },
        Some("message_stop") => Event::Stop,
        Some("error") => {
            let msg = parsed["error"]["message"].as_str().unwrap_or("Unknown error");
            let kind = parsed["error"]["type"].as_str().unwrap_or("");
            error!("Anthropic error: {}", msg);
            Event::Error(classify_failure(None, &format!("{kind}: {msg}")))
        }
        _ => Event::Ignore,
    }
}

fn gemini_event(data: &str) -> Event {
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return Event::Ignore;
    };
    if let Some(err) = parsed.get("error") {
        let status = err["code"].as_u64().and_then(|c| u16::try_from(c).ok());
        let msg = err["message"].as_str().unwrap_or("Unknown error");
        return Event::Error(classify_failure(status, msg));
    }
    let text: String = parsed["candidates"][0]["content"]["parts"]
        .as_array()
        .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
        .unwrap_or_default();
    if text.is_empty() {
        Event::Ignore
    } else {
        Event::Token(text)
    }
}

/// Raw body bytes split into lines. Only complete lines are decoded, so a
/// UTF-8 sequence split across network chunks is reassembled first.
#[derive(Default)]
struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    fn push(&mut self, bytes: &[u8]) {
        self.pending.extend_from_slice(bytes);
    }

    /// Next complete line, trimmed.
    fn next_line(&mut self) -> Option<String> {
        let end = self.pending.iter().position(|&b| b == b'\n')?;
        let raw: Vec<u8> = self.pending.drain(..=end).collect();
        Some(String::from_utf8_lossy(&raw).trim().to_string())
    }
}

/// Send `request` and decode its SSE body with `decode`.
fn sse_stream(
    request: RequestBuilder,
    decode: fn(&str) -> Event,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    async_stream::stream! {
        let response = match request
            .header("Content-Type", "application/json")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                let err = if e.is_timeout() {
                    GenerationError::Timeout(e.to_string())
                } else {
                    classify_failure(None, &format!("Request failed: {}", e))
                };
                yield StreamChunk::Error(err);
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(classify_failure(
                Some(status.as_u16()),
                &format!("API error {}: {}", status, body),
            ));
            return;
        }

        let mut stream = response.bytes_stream();
        let mut lines = LineBuffer::default();
        let mut token_count = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(classify_failure(None, &format!("Stream read error: {}", e)));
                    return;
                }
            };

            lines.push(&bytes);

            while let Some(line) = lines.next_line() {
                if line.is_empty() || line.starts_with(':') {
                    continue;
                }

                if let Some(data) = line.strip_prefix("data:") {
                    match decode(data.trim_start()) {
                        Event::Token(t) => {
                            token_count += 1;
                            yield StreamChunk::Token(t);
                        }
                        Event::Stop => {
                            yield StreamChunk::Done { tokens_used: token_count };
                            return;
                        }
                        Event::Error(e) => {
                            yield StreamChunk::Error(e);
                            return;
                        }
                        Event::Ignore => {}
                    }
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_delta_and_done() {
        let data = r#"{"choices":[{"delta":{"content":"Hel"}}]}"#;
        assert!(matches!(openai_event(data), Event::Token(t) if t == "Hel"));
        assert!(matches!(openai_event("[DONE]"), Event::Stop));
        assert!(matches!(openai_event("not json"), Event::Ignore));
    }

    #[test]
    fn test_anthropic_rate_limit_event() {
        let data = r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#;
        assert!(matches!(
            anthropic_event(data),
            Event::Error(GenerationError::RateLimited(_))
        ));
    }

    #[test]
    fn test_gemini_parts_and_errors() {
        let data = r#"{"candidates":[{"content":{"parts":[{"text":"a"},{"text":"b"}]}}]}"#;
        assert!(matches!(gemini_event(data), Event::Token(t) if t == "ab"));
        let err = r#"{"error":{"code":429,"message":"Resource exhausted"}}"#;
        assert!(matches!(
            gemini_event(err),
            Event::Error(GenerationError::RateLimited(_))
        ));
    }

    #[test]
    fn test_line_buffer_joins_split_characters() {
        let line = "data: {\"choices\":[{\"delta\":{\"content\":\"café ☕\"}}]}\n".as_bytes();
        let split = line.len() - 8;
        let mut lines = LineBuffer::default();
        lines.push(&line[..split]);
        assert!(lines.next_line().is_none());
        lines.push(&line[split..]);

        let decoded = lines.next_line().unwrap();
        assert!(!decoded.contains('\u{FFFD}'));
        let data = decoded.strip_prefix("data:").unwrap().trim_start();
        assert!(matches!(openai_event(data), Event::Token(t) if t == "café ☕"));
        assert!(lines.next_line().is_none());
    }
}
