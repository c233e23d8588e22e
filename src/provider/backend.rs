//! Seam between the adapter and whatever actually talks to the vendor

use super::ProviderError;
use async_openai::types::ChatCompletionRequestMessage;
use async_trait::async_trait;
use tokio::sync::mpsc;

/// Delta events from a streaming response
#[derive(Debug, Clone, PartialEq)]
pub enum StreamDelta {
    /// Non-empty text content delta
    Text(String),
    /// Usage info (sent at end of stream when the vendor reports it)
    Usage { input: u64, output: u64 },
    /// Stream finished
    Done,
}

/// One fully resolved chat completion call
#[derive(Debug, Clone)]
pub struct ChatCompletion {
    pub model: String,
    pub messages: Vec<ChatCompletionRequestMessage>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Something that can answer chat completions.
///
/// `ProviderClient` is the real implementation; tests and hosts with their
/// own transport provide others.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Whether the backend can issue requests at all.
    fn check_ready(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    /// Single non-streaming request returning the full reply text
    async fn complete(&self, request: ChatCompletion) -> Result<String, ProviderError>;

    /// Streaming request. Deltas go through `tx`; `StreamDelta::Done` is
    /// sent before returning `Ok`.
    async fn stream(
        &self,
        request: ChatCompletion,
        tx: mpsc::UnboundedSender<StreamDelta>,
    ) -> Result<(), ProviderError>;
}
