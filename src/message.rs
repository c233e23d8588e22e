//! Conversation history and its translation to the vendor message schema.
//!
//! History is stored as the host keeps it: a flat list of alternating
//! user/assistant turns. On every request `build_messages()` produces a
//! fresh wire-format list from it.

use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Alternating user/assistant turns. Even indices are user turns, odd
/// indices assistant turns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    turns: Vec<String>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Completed (user, assistant) pairs in order. A trailing user turn
    /// without a reply is skipped.
    pub fn pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.turns
            .chunks_exact(2)
            .map(|pair| (pair[0].as_str(), pair[1].as_str()))
    }

    /// Append a finished exchange
    pub fn push_pair(&mut self, user: impl Into<String>, assistant: impl Into<String>) {
        self.turns.push(user.into());
        self.turns.push(assistant.into());
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn as_slice(&self) -> &[String] {
        &self.turns
    }
}

impl From<Vec<String>> for History {
    fn from(turns: Vec<String>) -> Self {
        Self { turns }
    }
}

impl<const N: usize> From<[&str; N]> for History {
    fn from(turns: [&str; N]) -> Self {
        Self {
            turns: turns.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Build the vendor message list: one system entry, the history pairs in
/// order, then the current input as the last user message.
pub fn build_messages(
    system_prompt: &str,
    history: &History,
    input: &str,
) -> Vec<ChatCompletionRequestMessage> {
    let mut messages = Vec::with_capacity(history.len() + 2);

    if let Ok(msg) = ChatCompletionRequestSystemMessageArgs::default()
        .content(system_prompt)
        .build()
    {
        messages.push(msg.into());
    }

    for (user, assistant) in history.pairs() {
        if let Ok(msg) = ChatCompletionRequestUserMessageArgs::default()
            .content(user)
            .build()
        {
            messages.push(msg.into());
        }
        if let Ok(msg) = ChatCompletionRequestAssistantMessageArgs::default()
            .content(assistant)
            .build()
        {
            messages.push(msg.into());
        }
    }

    if let Ok(msg) = ChatCompletionRequestUserMessageArgs::default()
        .content(input)
        .build()
    {
        messages.push(msg.into());
    }

    messages
}

/// Convert request messages to the plain `{role, content}` JSON shape
pub fn messages_to_json(messages: &[ChatCompletionRequestMessage]) -> Vec<serde_json::Value> {
    messages.iter().map(message_to_json).collect()
}

fn message_to_json(msg: &ChatCompletionRequestMessage) -> serde_json::Value {
    use async_openai::types::*;

    match msg {
        ChatCompletionRequestMessage::System(s) => {
            serde_json::json!({
                "role": "system",
                "content": s.content
            })
        }
        ChatCompletionRequestMessage::User(u) => {
            let content = match &u.content {
                ChatCompletionRequestUserMessageContent::Text(t) => t.clone(),
                ChatCompletionRequestUserMessageContent::Array(parts) => parts
                    .iter()
                    .filter_map(|p| {
                        if let ChatCompletionRequestUserMessageContentPart::Text(t) = p {
                            Some(t.text.clone())
                        } else {
                            None
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(""),
            };
            serde_json::json!({
                "role": "user",
                "content": content
            })
        }
        ChatCompletionRequestMessage::Assistant(a) => {
            let mut msg = serde_json::json!({ "role": "assistant" });
            if let Some(content) = &a.content {
                msg["content"] = serde_json::json!(content);
            }
            msg
        }
        _ => serde_json::json!({"role": "unknown"}),
    }
}

/// Append an inline image block per path to the input text, the way the
/// chat UI renders uploaded images.
pub fn make_media_input<P: AsRef<Path>>(input: &str, image_paths: &[P]) -> String {
    let mut out = input.to_string();
    for path in image_paths {
        let path = path.as_ref();
        let abs = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
        out.push_str(&format!(
            "<br/><br/><div align=\"center\"><img src=\"file={}\"></div>",
            abs.display()
        ));
    }
    out
}
