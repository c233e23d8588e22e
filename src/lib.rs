//! Ark Bridge - Volcengine Ark chat adapter
//!
//! This crate provides:
//! - A blocking and a streaming entry point over an OpenAI-compatible chat API
//! - Translation of turn-pair history into the vendor message list
//! - Progress events for driving a chat UI
//! - CLI/REPL host for trying it out

pub mod auth;
pub mod bridge;
pub mod chat_log;
pub mod chat_view;
pub mod config;
pub mod error;
pub mod events;
pub mod functional;
pub mod message;
pub mod observe;
pub mod provider;
pub mod telemetry;

pub use auth::AuthConfig;
pub use bridge::{ArkBridge, ChatRequest, ModelBridge};
pub use chat_log::{ChatLog, ChatLogEntry, MemoryChatLog, SqliteChatLog};
pub use chat_view::{drive, ChatView};
pub use config::{BridgeConfig, ModelParams, MODEL_SENTINEL};
pub use error::BridgeError;
pub use events::{ChatEvent, TurnOutcome, TurnStatus};
pub use functional::{CoreFunction, FunctionRegistry, InputPreprocessor};
pub use message::{build_messages, make_media_input, History};
pub use observe::ObserveWindow;
pub use provider::{ChatBackend, ChatCompletion, ProviderClient, ProviderConfig, ProviderError, StreamDelta};
pub use telemetry::Telemetry;
