//! Stored credentials in `<data dir>/auth.json`
//!
//! ```json
//! { "volcengine": { "type": "api", "key": "...", "base_url": "..." } }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Entry name read for the Ark endpoint
pub const VOLCENGINE_PROVIDER: &str = "volcengine";

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum AuthEntry {
    #[serde(rename = "api")]
    Api {
        key: String,
        #[serde(default)]
        base_url: Option<String>,
    },
}

impl AuthEntry {
    pub fn api_key(&self) -> &str {
        match self {
            AuthEntry::Api { key, .. } => key,
        }
    }

    pub fn base_url(&self) -> Option<&str> {
        match self {
            AuthEntry::Api { base_url, .. } => base_url.as_deref(),
        }
    }
}

/// Parsed auth.json, keyed by provider name
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct AuthConfig {
    entries: HashMap<String, AuthEntry>,
}

impl AuthConfig {
    /// Read auth.json from the data directory
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Read a specific file; a missing file is an empty config
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn config_path() -> PathBuf {
        crate::config::data_dir().join("auth.json")
    }

    pub fn get(&self, provider: &str) -> Option<&AuthEntry> {
        self.entries.get(provider)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_entries() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(
            &path,
            r#"{
                "volcengine": {"type": "api", "key": "ark-xxx"},
                "local": {"type": "api", "key": "none", "base_url": "http://localhost:1234/v1"}
            }"#,
        )
        .unwrap();

        let config = AuthConfig::load_from(&path).unwrap();
        let ark = config.get(VOLCENGINE_PROVIDER).unwrap();
        assert_eq!(ark.api_key(), "ark-xxx");
        assert_eq!(ark.base_url(), None);
        assert_eq!(
            config.get("local").and_then(|e| e.base_url()),
            Some("http://localhost:1234/v1")
        );
        assert!(config.get("missing").is_none());
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let config = AuthConfig::load_from(&dir.path().join("auth.json")).unwrap();
        assert!(config.is_empty());
    }

    #[test]
    fn test_lives_in_shared_data_dir() {
        assert_eq!(
            AuthConfig::config_path().parent(),
            Some(crate::config::data_dir().as_path())
        );
    }
}
