//! Chat progress events
//!
//! These events are emitted by the bridge during a streaming turn and
//! consumed by whatever renders the conversation. Each event is one UI
//! refresh.

use crate::message::History;
use serde::Serialize;

/// Events emitted during a streaming turn
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// Turn started; the UI shows a placeholder pair for `input`
    TurnStart { input: String },

    /// An additional function rewrote the input
    InputRewritten { input: String },

    /// Streaming text delta; `text` is everything received so far
    Delta { delta: String, text: String },

    /// A precondition failed; replaces the last reply
    Notice { message: String },

    /// The vendor call failed; replaces the last reply
    Error { message: String },

    /// Final pair for the turn
    TurnComplete { input: String, output: String },
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    /// Reply received in full
    Completed,
    /// Vendor call failed; the reply is an error message
    Failed,
    /// Stopped before any request (credential, backend, additional function)
    Rejected,
    /// Host dropped the event receiver; nothing was recorded
    Cancelled,
}

/// Result of `ArkBridge::predict`
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    /// Input as sent (after any additional function)
    pub input: String,
    /// Reply text, or the error/notice shown in its place
    pub output: String,
    /// Model id used, if a request was made
    pub model: Option<String>,
    /// History after the turn; extended by one pair unless rejected or cancelled
    pub history: History,
}

impl TurnOutcome {
    pub fn is_completed(&self) -> bool {
        self.status == TurnStatus::Completed
    }
}
