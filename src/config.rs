//! Configuration for the Ark bridge

use crate::auth::{AuthConfig, VOLCENGINE_PROVIDER};
use crate::provider::{ProviderConfig, ARK_BASE_URL};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Model id that callers pass to mean "use the configured default model"
pub const MODEL_SENTINEL: &str = "volcengine";

pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 2048;

/// Environment variable names
pub const ENV_API_KEY: &str = "ARK_API_KEY";
pub const ENV_API_URL: &str = "ARK_API_URL";
pub const ENV_MODEL_ID: &str = "ARK_API_ID";

/// Per-user data directory: the platform data dir (`~/.local/share` on
/// Linux) joined with `ark-bridge`, or `./.ark-bridge` if there is none.
/// Holds auth.json, the logs, the chat log and the REPL history.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("ark-bridge"))
        .unwrap_or_else(|| PathBuf::from(".ark-bridge"))
}

/// Settings owned by one bridge instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// API key; empty means unconfigured
    #[serde(skip_serializing)]
    pub api_key: String,

    /// Base URL for the API
    pub base_url: String,

    /// Model (endpoint) id used when callers pass the sentinel
    pub default_model: String,

    /// How long the blocking call waits for a host heartbeat
    pub watchdog_patience_secs: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: ARK_BASE_URL.to_string(),
            default_model: String::new(),
            watchdog_patience_secs: 5,
        }
    }
}

impl BridgeConfig {
    /// Resolve config: YAML file (if any), then environment, then auth.json
    /// for anything still unset.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let _ = dotenvy::dotenv();

        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|name| std::env::var(name).ok());

        if !config.has_api_key() {
            match AuthConfig::load() {
                Ok(auth) => config.apply_auth(&auth),
                Err(e) => tracing::warn!(error = %e, "Failed to read auth.json"),
            }
        }

        Ok(config)
    }

    /// Load a YAML config file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: BridgeConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Override fields from environment-style lookups. Empty values are ignored.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.api_key = key;
        }
        if let Some(url) = get(ENV_API_URL) {
            self.base_url = url;
        }
        if let Some(model) = get(ENV_MODEL_ID) {
            self.default_model = model;
        }
    }

    /// Fill key (and base URL, if the entry has one) from auth.json
    pub fn apply_auth(&mut self, auth: &AuthConfig) {
        let Some(entry) = auth.get(VOLCENGINE_PROVIDER) else {
            return;
        };
        if !self.has_api_key() {
            self.api_key = entry.api_key().to_string();
        }
        if let Some(base_url) = entry.base_url() {
            self.base_url = base_url.to_string();
        }
    }

    /// Set API key
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = api_key.into();
        self
    }

    /// Set base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Set default model id
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    pub fn watchdog_patience(&self) -> Duration {
        Duration::from_secs(self.watchdog_patience_secs)
    }

    /// Substitute the default model for the sentinel (or an empty id)
    pub fn resolve_model<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.is_empty() || requested == MODEL_SENTINEL {
            &self.default_model
        } else {
            requested
        }
    }

    /// Provider settings for the HTTP client
    pub fn provider_config(&self) -> ProviderConfig {
        ProviderConfig::custom("VolcEngine", &self.base_url, &self.api_key)
    }
}

/// Per-call model parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParams {
    /// Model id, or `MODEL_SENTINEL` for the configured default
    pub llm_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub stream: bool,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            llm_model: MODEL_SENTINEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            stream: true,
        }
    }
}

impl ModelParams {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.llm_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_sentinel_resolves_to_default_model() {
        let config = BridgeConfig::default().with_default_model("ep-20250101-abc");
        assert_eq!(config.resolve_model(MODEL_SENTINEL), "ep-20250101-abc");
        assert_eq!(config.resolve_model(""), "ep-20250101-abc");
        assert_eq!(config.resolve_model("doubao-pro-32k"), "doubao-pro-32k");
    }

    #[test]
    fn test_has_api_key() {
        assert!(!BridgeConfig::default().has_api_key());
        assert!(!BridgeConfig::default().with_api_key("   ").has_api_key());
        assert!(BridgeConfig::default().with_api_key("k").has_api_key());
    }

    #[test]
    fn test_apply_env() {
        let vars: HashMap<&str, &str> = [
            (ENV_API_KEY, "env-key"),
            (ENV_API_URL, ""),
            (ENV_MODEL_ID, "ep-env"),
        ]
        .into_iter()
        .collect();

        let mut config = BridgeConfig::default();
        config.apply_env(|name| vars.get(name).map(|v| v.to_string()));

        assert_eq!(config.api_key, "env-key");
        // empty value leaves the default in place
        assert_eq!(config.base_url, ARK_BASE_URL);
        assert_eq!(config.default_model, "ep-env");
    }

    #[test]
    fn test_apply_auth_does_not_override_key() {
        let auth: AuthConfig = serde_json::from_str(
            r#"{"volcengine": {"type": "api", "key": "file-key", "base_url": "http://proxy/v3"}}"#,
        )
        .unwrap();

        let mut config = BridgeConfig::default();
        config.apply_auth(&auth);
        assert_eq!(config.api_key, "file-key");
        assert_eq!(config.base_url, "http://proxy/v3");

        let mut config = BridgeConfig::default().with_api_key("explicit");
        config.apply_auth(&auth);
        assert_eq!(config.api_key, "explicit");
    }

    #[test]
    fn test_from_yaml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ark.yaml");
        std::fs::write(
            &path,
            "api_key: yaml-key\ndefault_model: ep-yaml\nwatchdog_patience_secs: 9\n",
        )
        .unwrap();

        let config = BridgeConfig::from_file(&path).unwrap();
        assert_eq!(config.api_key, "yaml-key");
        assert_eq!(config.default_model, "ep-yaml");
        assert_eq!(config.base_url, ARK_BASE_URL);
        assert_eq!(config.watchdog_patience(), Duration::from_secs(9));
    }

    #[test]
    fn test_model_params_defaults() {
        let params: ModelParams = serde_json::from_str(r#"{"temperature": 0.2}"#).unwrap();
        assert_eq!(params.llm_model, MODEL_SENTINEL);
        assert_eq!(params.temperature, 0.2);
        assert_eq!(params.max_tokens, DEFAULT_MAX_TOKENS);
        assert!(params.stream);
    }
}
