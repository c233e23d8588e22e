//! Bridge errors and their translation to chat text

use crate::config::ENV_API_KEY;
use crate::provider::ProviderError;

/// Everything that can stop a turn from producing a model reply
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("ARK_API_KEY is not configured")]
    MissingCredential,

    #[error("backend unavailable: {0}")]
    BackendUnavailable(#[source] ProviderError),

    #[error("unknown additional function '{0}'")]
    UnknownFunction(String),

    #[error("template error: {0}")]
    Template(#[from] handlebars::RenderError),

    #[error("invalid template: {0}")]
    InvalidTemplate(#[from] handlebars::TemplateError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("caller stopped responding (no heartbeat for {0}s)")]
    Abandoned(u64),

    #[error("runtime error: {0}")]
    Runtime(#[from] std::io::Error),
}

impl BridgeError {
    /// Text shown in the conversation for this error
    pub fn user_message(&self) -> String {
        match self {
            BridgeError::MissingCredential => {
                format!("[Local Message] Please configure {ENV_API_KEY}")
            }
            BridgeError::BackendUnavailable(e) => format!(
                "[Local Message] The VolcEngine client cannot be used ({e}). Check ARK_API_URL and the installation."
            ),
            BridgeError::UnknownFunction(_)
            | BridgeError::Template(_)
            | BridgeError::InvalidTemplate(_) => {
                format!("[Local Message] {self}")
            }
            BridgeError::Provider(e) => format!("[Error] API request failed: {e}"),
            BridgeError::Abandoned(_) | BridgeError::Runtime(_) => format!("Request failed: {self}"),
        }
    }

    /// Reply returned by the blocking call in place of model output
    pub fn failure_reply(&self) -> String {
        match self {
            BridgeError::Provider(_) | BridgeError::Abandoned(_) | BridgeError::Runtime(_) => {
                format!("Request failed: {self}")
            }
            _ => self.user_message(),
        }
    }
}
