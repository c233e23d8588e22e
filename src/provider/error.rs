//! Error kinds returned by the vendor-call wrapper

use async_openai::error::OpenAIError;

/// Failure of a single vendor call. Nothing here is retried.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("failed to build request: {0}")]
    Build(String),

    #[error("{0}")]
    Api(#[from] OpenAIError),

    #[error("API error {status}: {body}")]
    Http { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("stream error: {0}")]
    Stream(String),

    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no content in response")]
    EmptyResponse,

    #[error("invalid base URL '{0}'")]
    InvalidBaseUrl(String),
}
