//! OpenAI-compatible provider client
//!
//! Blocking completions go through async-openai. Streaming uses raw HTTP
//! with an SSE decoder so partial content can be forwarded as soon as each
//! chunk arrives.

use super::{ChatBackend, ChatCompletion, ProviderConfig, ProviderError, StreamDelta};
use crate::message::messages_to_json;
use async_openai::{config::OpenAIConfig, types::CreateChatCompletionRequestArgs, Client};
use async_trait::async_trait;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

// Internal types for parsing streaming responses
#[derive(Debug, Default, serde::Deserialize)]
struct StreamChunkDelta {
    content: Option<String>,
}

#[derive(Debug, serde::Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamChunkDelta,
}

#[derive(Debug, serde::Deserialize)]
struct StreamUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, serde::Deserialize)]
struct StreamErrorBody {
    message: String,
}

#[derive(Debug, serde::Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
    usage: Option<StreamUsage>,
    error: Option<StreamErrorBody>,
}

/// OpenAI-compatible client wrapper
#[derive(Clone)]
pub struct ProviderClient {
    config: ProviderConfig,
    client: Client<OpenAIConfig>,
    http_client: reqwest::Client,
}

impl ProviderClient {
    /// Create a new provider client from config
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        let http_client = reqwest::Client::builder().build()?;

        let client = Client::with_config(openai_config)
            .with_http_client(http_client.clone())
            .with_backoff(no_retry());

        Ok(Self {
            config,
            client,
            http_client,
        })
    }
}

/// Backoff that gives up after the first failure.
fn no_retry() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

#[async_trait]
impl ChatBackend for ProviderClient {
    fn check_ready(&self) -> Result<(), ProviderError> {
        let url = reqwest::Url::parse(&self.config.base_url)
            .map_err(|_| ProviderError::InvalidBaseUrl(self.config.base_url.clone()))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            _ => Err(ProviderError::InvalidBaseUrl(self.config.base_url.clone())),
        }
    }

    async fn complete(&self, request: ChatCompletion) -> Result<String, ProviderError> {
        let start = Instant::now();
        let model = request.model.clone();

        let body = CreateChatCompletionRequestArgs::default()
            .model(request.model)
            .messages(request.messages)
            .temperature(request.temperature)
            .max_tokens(request.max_tokens)
            .stream(false)
            .build()?;

        let response = self.client.chat().create(body).await.map_err(|e| {
            tracing::error!(target: "ark", error = %e, "Chat completion call failed");
            e
        })?;

        tracing::debug!(
            target: "ark",
            model = %model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            input_tokens = response.usage.as_ref().map(|u| u.prompt_tokens),
            output_tokens = response.usage.as_ref().map(|u| u.completion_tokens),
            "Chat completion call completed"
        );

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(ProviderError::EmptyResponse)
    }

    async fn stream(
        &self,
        request: ChatCompletion,
        tx: mpsc::UnboundedSender<StreamDelta>,
    ) -> Result<(), ProviderError> {
        let start = Instant::now();

        let body = serde_json::json!({
            "model": request.model,
            "messages": messages_to_json(&request.messages),
            "stream": true,
            "stream_options": {"include_usage": true},
            "temperature": request.temperature,
            "max_tokens": request.max_tokens
        });

        let response = self
            .http_client
            .post(self.config.completions_url())
            .bearer_auth(&self.config.api_key)
            .header("Accept", "text/event-stream")
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http { status, body });
        }

        let mut events = response.bytes_stream().eventsource();

        while let Some(event) = events.next().await {
            let event = event.map_err(|e| ProviderError::Stream(e.to_string()))?;
            let data = event.data.trim();

            if data.is_empty() {
                continue;
            }
            if data == "[DONE]" {
                break;
            }

            let chunk: StreamChunk = serde_json::from_str(data)?;
            if let Some(error) = chunk.error {
                return Err(ProviderError::Stream(error.message));
            }

            if let Some(usage) = chunk.usage {
                let _ = tx.send(StreamDelta::Usage {
                    input: usage.prompt_tokens,
                    output: usage.completion_tokens,
                });
            }

            for choice in chunk.choices {
                let Some(content) = choice.delta.content else {
                    continue;
                };
                if content.is_empty() {
                    continue;
                }
                if tx.send(StreamDelta::Text(content)).is_err() {
                    // Receiver gone: nobody is driving the turn anymore
                    tracing::debug!(target: "ark", "Stream receiver dropped, stopping");
                    return Ok(());
                }
            }
        }

        tracing::debug!(
            target: "ark",
            model = %request.model,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Streaming chat call completed"
        );

        let _ = tx.send(StreamDelta::Done);
        Ok(())
    }
}
