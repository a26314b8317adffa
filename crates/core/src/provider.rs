//! ModelProvider trait — the abstraction over LLM backends.
//!
//! A provider knows how to send an assembled prompt to a model and get a
//! response back, either as a complete message or as a stream of chunks.
//! The concrete vendor call (HTTP, SDK, local inference) lives behind this
//! trait and is out of scope for the orchestration core.

use crate::error::ProviderError;
use crate::message::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A fully assembled request for one model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The model to use (e.g., "claude-sonnet-4", "gpt-4o").
    pub model: String,

    /// Resolved system prompt, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// The conversation messages (assembled user prompt last).
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic, 1.0 = creative).
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Whether the caller wants a streamed response.
    #[serde(default)]
    pub stream: bool,
}

fn default_temperature() -> f32 {
    0.7
}

impl GenerationRequest {
    /// Create a minimal request with defaults.
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            system_prompt: None,
            messages,
            temperature: default_temperature(),
            max_tokens: None,
            stream: false,
        }
    }

    /// Total characters across system prompt and all messages.
    /// Used by billing estimation when real token counts are missing.
    pub fn prompt_chars(&self) -> usize {
        let system = self.system_prompt.as_deref().unwrap_or("").chars().count();
        system
            + self
                .messages
                .iter()
                .map(|m| m.content.chars().count())
                .sum::<usize>()
    }
}

/// Token usage information reported by a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// A complete (non-streaming) response from a provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// The generated text.
    pub content: String,

    /// Token usage statistics, when the vendor reports them.
    pub usage: Option<Usage>,

    /// Which model actually responded (may differ from requested).
    pub model: String,
}

/// A single chunk in a streaming response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Partial content delta.
    #[serde(default)]
    pub content: Option<String>,

    /// Keep-alive marker with no content. Heartbeats do not reset the
    /// silence watchdog.
    #[serde(default)]
    pub heartbeat: bool,

    /// Whether this is the final chunk.
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

impl StreamChunk {
    /// A content-bearing chunk.
    pub fn content(text: impl Into<String>) -> Self {
        Self {
            content: Some(text.into()),
            heartbeat: false,
            done: false,
            usage: None,
        }
    }

    /// A keep-alive chunk.
    pub fn heartbeat() -> Self {
        Self {
            content: None,
            heartbeat: true,
            done: false,
            usage: None,
        }
    }

    /// The terminal chunk, optionally carrying usage.
    pub fn done(usage: Option<Usage>) -> Self {
        Self {
            content: None,
            heartbeat: false,
            done: true,
            usage,
        }
    }

    /// True for chunks that carry real content (heartbeats excluded).
    pub fn is_content(&self) -> bool {
        !self.heartbeat && self.content.as_deref().is_some_and(|c| !c.is_empty())
    }
}

/// The core ModelProvider trait.
///
/// Every backend (vendor API, shared pool, test double) implements this.
/// The router hands out `Arc<dyn ModelProvider>` without the pipeline
/// knowing which backend is in play.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// A human-readable name for this provider (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete response.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<GenerationResponse, ProviderError>;

    /// Send a request and get a stream of response chunks.
    ///
    /// Default implementation calls `generate()` and wraps the result as a
    /// single content chunk followed by a terminal chunk.
    async fn generate_stream(
        &self,
        request: GenerationRequest,
    ) -> std::result::Result<
        tokio::sync::mpsc::Receiver<std::result::Result<StreamChunk, ProviderError>>,
        ProviderError,
    > {
        let response = self.generate(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(2);
        let _ = tx.send(Ok(StreamChunk::content(response.content))).await;
        let _ = tx.send(Ok(StreamChunk::done(response.usage))).await;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_defaults() {
        let req = GenerationRequest::new("claude-sonnet-4", vec![Message::user("hi")]);
        assert!((req.temperature - 0.7).abs() < f32::EPSILON);
        assert!(!req.stream);
        assert!(req.max_tokens.is_none());
    }

    #[test]
    fn prompt_chars_counts_system_and_messages() {
        let mut req = GenerationRequest::new("m", vec![Message::user("abcd")]);
        req.system_prompt = Some("xy".into());
        assert_eq!(req.prompt_chars(), 6);
    }

    #[test]
    fn heartbeat_is_not_content() {
        assert!(!StreamChunk::heartbeat().is_content());
        assert!(!StreamChunk::done(None).is_content());
        assert!(StreamChunk::content("text").is_content());
        assert!(!StreamChunk::content("").is_content());
    }

    #[test]
    fn usage_totals() {
        let usage = Usage::new(100, 40);
        assert_eq!(usage.total_tokens, 140);
    }

    struct EchoProvider;

    #[async_trait]
    impl ModelProvider for EchoProvider {
        fn name(&self) -> &str {
            "echo"
        }

        async fn generate(
            &self,
            request: GenerationRequest,
        ) -> std::result::Result<GenerationResponse, ProviderError> {
            Ok(GenerationResponse {
                content: request.messages.last().map(|m| m.content.clone()).unwrap_or_default(),
                usage: Some(Usage::new(5, 5)),
                model: request.model,
            })
        }
    }

    #[tokio::test]
    async fn default_stream_wraps_generate() {
        let provider = EchoProvider;
        let mut rx = provider
            .generate_stream(GenerationRequest::new("m", vec![Message::user("hello")]))
            .await
            .unwrap();

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first.content.as_deref(), Some("hello"));

        let last = rx.recv().await.unwrap().unwrap();
        assert!(last.done);
        assert!(last.usage.is_some());
    }
}
