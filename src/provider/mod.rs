//! Vendor-call layer
//!
//! OpenAI-compatible provider for chat completions, blocking or streamed.
//! Any endpoint implementing the chat completions API works; Volcengine Ark
//! is the default.

mod backend;
mod client;
mod config;
mod error;

pub use backend::*;
pub use client::*;
pub use config::*;
pub use error::*;
