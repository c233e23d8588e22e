//! Provider configuration

use serde::{Deserialize, Serialize};

/// Default Ark endpoint (Beijing region)
pub const ARK_BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

/// Configuration for an OpenAI-compatible provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Display name for the provider
    pub name: String,
    /// API base URL (e.g., "https://ark.cn-beijing.volces.com/api/v3")
    pub base_url: String,
    /// Bearer credential sent with every request
    #[serde(skip_serializing)]
    pub api_key: String,
}

impl ProviderConfig {
    /// Create a Volcengine Ark provider config
    pub fn volcengine(api_key: impl Into<String>) -> Self {
        Self {
            name: "VolcEngine".to_string(),
            base_url: ARK_BASE_URL.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Create a custom provider config (any OpenAI-compatible endpoint)
    pub fn custom(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Endpoint for chat completions, tolerating a trailing slash on the base
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
