//! The Ark bridge: turns a chat request into a vendor call and reports the
//! result back as chat text.
//!
//! Two entry points:
//! - `complete` issues one blocking request and returns the reply text.
//! - `predict` streams the reply, emitting a `ChatEvent` per UI refresh.
//!
//! Neither returns an error. Every failure becomes chat text here.

use crate::chat_log::{ChatLog, ChatLogEntry, NoopChatLog};
use crate::config::{BridgeConfig, ModelParams};
use crate::error::BridgeError;
use crate::events::{ChatEvent, TurnOutcome, TurnStatus};
use crate::functional::{FunctionRegistry, InputPreprocessor};
use crate::message::{build_messages, History};
use crate::observe::ObserveWindow;
use crate::provider::{ChatBackend, ChatCompletion, ProviderClient, ProviderError, StreamDelta};
use async_openai::types::ChatCompletionRequestMessage;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// How often the blocking call checks the caller's heartbeat
const WATCHDOG_TICK: Duration = Duration::from_millis(250);

/// One chat request as the host hands it over
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    /// This turn's user input
    pub input: String,
    pub params: ModelParams,
    /// Prior turns
    pub history: History,
    pub system_prompt: String,
    /// Additional function applied to the input before sending
    pub additional_fn: Option<String>,
}

impl ChatRequest {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            ..Default::default()
        }
    }

    pub fn with_params(mut self, params: ModelParams) -> Self {
        self.params = params;
        self
    }

    pub fn with_history(mut self, history: impl Into<History>) -> Self {
        self.history = history.into();
        self
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_additional_fn(mut self, function: impl Into<String>) -> Self {
        self.additional_fn = Some(function.into());
        self
    }
}

/// Entry points a host model-dispatch registry calls
#[async_trait]
pub trait ModelBridge: Send + Sync {
    /// Blocking single-shot call; returns reply text or an error message
    async fn complete(
        &self,
        request: ChatRequest,
        observe: Option<&ObserveWindow>,
        silent: bool,
    ) -> String;

    /// Streaming call; emits progress events and returns the finished turn
    async fn predict(&self, request: ChatRequest, events: mpsc::Sender<ChatEvent>) -> TurnOutcome;
}

/// Adapter for the Volcengine Ark chat API
pub struct ArkBridge {
    config: BridgeConfig,
    backend: Arc<dyn ChatBackend>,
    chat_log: Arc<dyn ChatLog>,
    preprocessor: Arc<dyn InputPreprocessor>,
}

impl ArkBridge {
    /// Bridge over the HTTP provider client
    pub fn new(config: BridgeConfig) -> Result<Self, ProviderError> {
        let backend = ProviderClient::new(config.provider_config())?;
        Ok(Self::with_backend(config, Arc::new(backend)))
    }

    /// Bridge over any backend
    pub fn with_backend(config: BridgeConfig, backend: Arc<dyn ChatBackend>) -> Self {
        Self {
            config,
            backend,
            chat_log: Arc::new(NoopChatLog),
            preprocessor: Arc::new(FunctionRegistry::builtin()),
        }
    }

    /// Set the chat-log recorder
    pub fn with_chat_log(mut self, chat_log: Arc<dyn ChatLog>) -> Self {
        self.chat_log = chat_log;
        self
    }

    /// Set the additional-function preprocessor
    pub fn with_preprocessor(mut self, preprocessor: Arc<dyn InputPreprocessor>) -> Self {
        self.preprocessor = preprocessor;
        self
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Whether an API key is configured
    pub fn validate_key(&self) -> bool {
        self.config.has_api_key()
    }

    fn completion(
        &self,
        model: &str,
        params: &ModelParams,
        messages: Vec<ChatCompletionRequestMessage>,
    ) -> ChatCompletion {
        ChatCompletion {
            model: model.to_string(),
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        }
    }

    /// Blocking call with the error kind left explicit
    pub async fn try_complete(
        &self,
        request: ChatRequest,
        observe: Option<&ObserveWindow>,
        silent: bool,
    ) -> Result<String, BridgeError> {
        if !self.validate_key() {
            return Err(BridgeError::MissingCredential);
        }
        self.backend
            .check_ready()
            .map_err(BridgeError::BackendUnavailable)?;

        let model = self.config.resolve_model(&request.params.llm_model);
        let messages = build_messages(&request.system_prompt, &request.history, &request.input);

        if silent {
            tracing::debug!(target: "ark", model = %model, message_count = messages.len(), "Starting chat call");
        } else {
            tracing::info!(target: "ark", model = %model, message_count = messages.len(), "Starting chat call");
        }

        let start = Instant::now();
        let call = self
            .backend
            .complete(self.completion(model, &request.params, messages));

        let reply = match observe {
            Some(window) => self.watch(call, window).await?,
            None => call.await?,
        };

        if let Some(window) = observe {
            window.set_text(reply.as_str());
        }

        if !silent {
            tracing::info!(
                target: "ark",
                model = %model,
                elapsed_ms = start.elapsed().as_millis() as u64,
                reply_chars = reply.chars().count(),
                "Chat call completed"
            );
        }

        Ok(reply)
    }

    /// Run `call` until it finishes or the caller stops heartbeating
    async fn watch<F>(&self, call: F, window: &ObserveWindow) -> Result<String, BridgeError>
    where
        F: Future<Output = Result<String, ProviderError>>,
    {
        let patience = self.config.watchdog_patience();
        let mut ticker = tokio::time::interval(WATCHDOG_TICK);
        tokio::pin!(call);

        loop {
            tokio::select! {
                result = &mut call => return Ok(result?),
                _ = ticker.tick() => {
                    if window.is_abandoned(patience) {
                        return Err(BridgeError::Abandoned(patience.as_secs()));
                    }
                }
            }
        }
    }

    /// Blocking call for hosts; failures come back as the reply text
    pub async fn complete(
        &self,
        request: ChatRequest,
        observe: Option<&ObserveWindow>,
        silent: bool,
    ) -> String {
        match self.try_complete(request, observe, silent).await {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(target: "ark", error = %e, "VolcEngine request failed");
                e.failure_reply()
            }
        }
    }

    /// `complete` on a private runtime, for a caller-managed worker thread.
    /// Called from inside a tokio runtime it refuses and returns the error text.
    pub fn complete_blocking(
        &self,
        request: ChatRequest,
        observe: Option<&ObserveWindow>,
        silent: bool,
    ) -> String {
        if tokio::runtime::Handle::try_current().is_ok() {
            let error = BridgeError::Runtime(std::io::Error::other(
                "complete_blocking called from inside an async runtime",
            ));
            tracing::error!(target: "ark", error = %error, "VolcEngine request refused");
            return error.failure_reply();
        }

        match tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
        {
            Ok(runtime) => runtime.block_on(self.complete(request, observe, silent)),
            Err(e) => BridgeError::Runtime(e).failure_reply(),
        }
    }

    /// Streaming call. Emits `TurnStart`, then either a `Notice` (rejected)
    /// or the deltas, an optional `Error` and `TurnComplete`. Once the host
    /// drops the receiver the turn ends `Cancelled` without touching the
    /// history or the chat log.
    pub async fn predict(
        &self,
        request: ChatRequest,
        events: mpsc::Sender<ChatEvent>,
    ) -> TurnOutcome {
        let ChatRequest {
            mut input,
            params,
            mut history,
            system_prompt,
            additional_fn,
        } = request;

        if !emit(&events, ChatEvent::TurnStart { input: input.clone() }).await {
            return cancelled(input, String::new(), history, None);
        }

        if let Err(e) = self.backend.check_ready() {
            return reject(&events, BridgeError::BackendUnavailable(e), input, history).await;
        }

        if !self.validate_key() {
            return reject(&events, BridgeError::MissingCredential, input, history).await;
        }

        // Returned untouched if the host cancels
        let prior = history.clone();

        if let Some(function) = additional_fn.as_deref() {
            match self.preprocessor.apply(function, &input, history.clone()) {
                Ok((rewritten, rewritten_history)) => {
                    input = rewritten;
                    history = rewritten_history;
                }
                Err(e) => return reject(&events, e, input, history).await,
            }
            if !emit(&events, ChatEvent::InputRewritten { input: input.clone() }).await {
                return cancelled(input, String::new(), prior, None);
            }
        }

        let model = self.config.resolve_model(&params.llm_model).to_string();
        let messages = build_messages(&system_prompt, &history, &input);

        tracing::info!(
            target: "ark",
            model = %model,
            message_count = messages.len(),
            additional_fn = additional_fn.as_deref(),
            "Starting streaming chat call"
        );

        // Spawn streaming task
        let (delta_tx, mut delta_rx) = mpsc::unbounded_channel();
        let backend = self.backend.clone();
        let completion = self.completion(&model, &params, messages);
        let stream_handle = tokio::spawn(async move { backend.stream(completion, delta_tx).await });

        let mut reply = String::new();
        let mut host_gone = false;

        while let Some(delta) = delta_rx.recv().await {
            match delta {
                StreamDelta::Text(text) => {
                    reply.push_str(&text);
                    let event = ChatEvent::Delta {
                        delta: text,
                        text: reply.clone(),
                    };
                    if !emit(&events, event).await {
                        host_gone = true;
                        stream_handle.abort();
                        break;
                    }
                }
                StreamDelta::Usage { input, output } => {
                    tracing::debug!(target: "ark", input_tokens = input, output_tokens = output, "Usage reported");
                }
                StreamDelta::Done => break,
            }
        }

        if host_gone {
            let _ = stream_handle.await;
            return cancelled(input, reply, prior, Some(model));
        }

        let failure = match stream_handle.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(BridgeError::Provider(e)),
            Err(e) => Some(BridgeError::Runtime(std::io::Error::other(e.to_string()))),
        };

        let status = match failure {
            None => TurnStatus::Completed,
            Some(error) => {
                tracing::error!(target: "ark", model = %model, error = %error, "Streaming chat call failed");
                reply = error.user_message();
                emit(&events, ChatEvent::Error { message: reply.clone() }).await;
                TurnStatus::Failed
            }
        };

        history.push_pair(input.as_str(), reply.as_str());

        if let Err(e) = self
            .chat_log
            .record(&ChatLogEntry::new(&model, &input, &reply))
        {
            tracing::warn!(target: "ark", error = %e, "Failed to record chat log");
        }

        emit(
            &events,
            ChatEvent::TurnComplete {
                input: input.clone(),
                output: reply.clone(),
            },
        )
        .await;

        TurnOutcome {
            status,
            input,
            output: reply,
            model: Some(model),
            history,
        }
    }
}

#[async_trait]
impl ModelBridge for ArkBridge {
    async fn complete(
        &self,
        request: ChatRequest,
        observe: Option<&ObserveWindow>,
        silent: bool,
    ) -> String {
        ArkBridge::complete(self, request, observe, silent).await
    }

    async fn predict(&self, request: ChatRequest, events: mpsc::Sender<ChatEvent>) -> TurnOutcome {
        ArkBridge::predict(self, request, events).await
    }
}

/// Send one event; false once the host has dropped the receiver
async fn emit(events: &mpsc::Sender<ChatEvent>, event: ChatEvent) -> bool {
    events.send(event).await.is_ok()
}

/// The host dropped the receiver: leave history and the chat log untouched
fn cancelled(
    input: String,
    partial: String,
    history: History,
    model: Option<String>,
) -> TurnOutcome {
    tracing::info!(target: "ark", partial_chars = partial.chars().count(), "Chat turn cancelled by host");
    TurnOutcome {
        status: TurnStatus::Cancelled,
        input,
        output: partial,
        model,
        history,
    }
}

async fn reject(
    events: &mpsc::Sender<ChatEvent>,
    error: BridgeError,
    input: String,
    history: History,
) -> TurnOutcome {
    tracing::warn!(target: "ark", error = %error, "Chat turn rejected");
    let message = error.user_message();
    emit(events, ChatEvent::Notice { message: message.clone() }).await;

    TurnOutcome {
        status: TurnStatus::Rejected,
        input,
        output: message,
        model: None,
        history,
    }
}
