//! Host-side chat state
//!
//! `ChatView` is the conversation as the UI shows it. The bridge never
//! touches it; the host applies `ChatEvent`s to it one at a time.

use crate::bridge::ModelBridge;
use crate::events::{ChatEvent, TurnOutcome};
use crate::ChatRequest;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Buffered events between the bridge and the host loop
const EVENT_BUFFER: usize = 1;

/// Displayed conversation: one `[input, reply]` pair per turn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatView {
    pub pairs: Vec<[String; 2]>,
}

impl ChatView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last displayed pair
    pub fn last(&self) -> Option<&[String; 2]> {
        self.pairs.last()
    }

    /// Replace the reply of the last pair (adds an empty pair if none)
    pub fn replace_last_reply(&mut self, reply: impl Into<String>) {
        if self.pairs.is_empty() {
            self.pairs.push([String::new(), String::new()]);
        }
        if let Some(last) = self.pairs.last_mut() {
            last[1] = reply.into();
        }
    }

    fn set_last(&mut self, input: &str, reply: &str) {
        match self.pairs.last_mut() {
            Some(last) => *last = [input.to_string(), reply.to_string()],
            None => self.pairs.push([input.to_string(), reply.to_string()]),
        }
    }

    /// Perform the UI mutation for one event
    pub fn apply(&mut self, event: &ChatEvent) {
        match event {
            ChatEvent::TurnStart { input } => {
                self.pairs.push([input.clone(), String::new()]);
            }
            ChatEvent::InputRewritten { input } => self.set_last(input, ""),
            ChatEvent::Delta { text, .. } => self.replace_last_reply(text.as_str()),
            ChatEvent::Notice { message } | ChatEvent::Error { message } => {
                self.replace_last_reply(message.as_str())
            }
            ChatEvent::TurnComplete { input, output } => self.set_last(input, output),
        }
    }
}

/// Run one streaming turn, applying every event to `view` and calling
/// `refresh` after each one.
pub async fn drive<B, F>(
    bridge: Arc<B>,
    request: ChatRequest,
    view: &mut ChatView,
    mut refresh: F,
) -> TurnOutcome
where
    B: ModelBridge + ?Sized + 'static,
    F: FnMut(&ChatView, &ChatEvent),
{
    let (tx, mut rx) = mpsc::channel(EVENT_BUFFER);
    let prior = request.history.clone();

    let turn = tokio::spawn(async move { bridge.predict(request, tx).await });

    while let Some(event) = rx.recv().await {
        view.apply(&event);
        refresh(view, &event);
    }

    match turn.await {
        Ok(outcome) => outcome,
        Err(e) => {
            // predict never returns an error; a join error means it panicked
            tracing::error!(target: "ark", error = %e, "Chat turn task failed");
            let message = format!("Request failed: {e}");
            view.replace_last_reply(message.as_str());
            TurnOutcome {
                status: crate::TurnStatus::Failed,
                input: view.last().map(|p| p[0].clone()).unwrap_or_default(),
                output: message,
                model: None,
                history: prior,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct PanickingBridge;

    #[async_trait::async_trait]
    impl ModelBridge for PanickingBridge {
        async fn complete(
            &self,
            _request: ChatRequest,
            _observe: Option<&crate::ObserveWindow>,
            _silent: bool,
        ) -> String {
            String::new()
        }

        async fn predict(&self, request: ChatRequest, events: mpsc::Sender<ChatEvent>) -> TurnOutcome {
            let _ = events
                .send(ChatEvent::TurnStart {
                    input: request.input.clone(),
                })
                .await;
            panic!("turn blew up");
        }
    }

    #[tokio::test]
    async fn test_drive_keeps_history_when_turn_panics() {
        let history = crate::History::from(["q0", "a0"]);
        let request = ChatRequest::new("q1").with_history(history.clone());
        let mut view = ChatView::new();

        let outcome = drive(Arc::new(PanickingBridge), request, &mut view, |_, _| {}).await;

        assert_eq!(outcome.status, crate::TurnStatus::Failed);
        assert_eq!(outcome.history, history);
        assert_eq!(outcome.input, "q1");
        assert!(view.last().unwrap()[1].starts_with("Request failed:"));
    }

    #[test]
    fn test_apply_sequence() {
        let mut view = ChatView::new();
        view.apply(&ChatEvent::TurnStart {
            input: "hello".into(),
        });
        assert_eq!(view.last(), Some(&["hello".to_string(), String::new()]));

        view.apply(&ChatEvent::Delta {
            delta: "Hi".into(),
            text: "Hi".into(),
        });
        view.apply(&ChatEvent::Delta {
            delta: " there".into(),
            text: "Hi there".into(),
        });
        assert_eq!(view.last().unwrap()[1], "Hi there");

        view.apply(&ChatEvent::TurnComplete {
            input: "hello".into(),
            output: "Hi there".into(),
        });
        assert_eq!(view.pairs.len(), 1);
        assert_eq!(view.pairs[0], ["hello".to_string(), "Hi there".to_string()]);
    }

    #[test]
    fn test_notice_replaces_placeholder() {
        let mut view = ChatView::new();
        view.apply(&ChatEvent::TurnStart { input: "q".into() });
        view.apply(&ChatEvent::Notice {
            message: "configure key".into(),
        });
        assert_eq!(view.pairs, vec![["q".to_string(), "configure key".to_string()]]);
    }

    #[test]
    fn test_rewrite_keeps_single_pair() {
        let mut view = ChatView::new();
        view.pairs.push(["old".into(), "answer".into()]);
        view.apply(&ChatEvent::TurnStart { input: "raw".into() });
        view.apply(&ChatEvent::InputRewritten {
            input: "Summarize: raw".into(),
        });
        assert_eq!(view.pairs.len(), 2);
        assert_eq!(view.pairs[1], ["Summarize: raw".to_string(), String::new()]);
    }
}
