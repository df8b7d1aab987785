//! Binding configuration.

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Configuration for a treaty client binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreatyConfig {
    /// Leading key segment shared by every key built through the binding.
    #[serde(default)]
    pub key_prefix: Option<String>,

    /// Propagate the caching layer's abort signal into endpoint calls by default.
    #[serde(default)]
    pub abort_on_unmount: bool,

    /// Remember the last verb that worked for each route.
    #[serde(default = "default_verb_cache")]
    pub verb_cache: bool,
}

fn default_verb_cache() -> bool {
    true
}

impl Default for TreatyConfig {
    fn default() -> Self {
        Self {
            key_prefix: None,
            abort_on_unmount: false,
            verb_cache: default_verb_cache(),
        }
    }
}

impl TreatyConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    /// Set the default abort propagation.
    pub fn with_abort_on_unmount(mut self, enabled: bool) -> Self {
        self.abort_on_unmount = enabled;
        self
    }

    /// Enable or disable the verb resolution cache.
    pub fn with_verb_cache(mut self, enabled: bool) -> Self {
        self.verb_cache = enabled;
        self
    }

    /// Parse from a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse TOML treaty config")
    }

    /// Parse from a JSON document.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse JSON treaty config")
    }

    /// Load from a file; `.json` files are parsed as JSON, anything else as TOML.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            Self::from_toml_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TreatyConfig::default();
        assert_eq!(config.key_prefix, None);
        assert!(!config.abort_on_unmount);
        assert!(config.verb_cache);
    }

    #[test]
    fn test_builder() {
        let config = TreatyConfig::new()
            .with_key_prefix("app")
            .with_abort_on_unmount(true)
            .with_verb_cache(false);
        assert_eq!(config.key_prefix.as_deref(), Some("app"));
        assert!(config.abort_on_unmount);
        assert!(!config.verb_cache);
    }

    #[test]
    fn test_from_toml() {
        let config = TreatyConfig::from_toml_str(
            r#"
            keyPrefix = "tenant-a"
            abortOnUnmount = true
            "#,
        )
        .unwrap();
        assert_eq!(config.key_prefix.as_deref(), Some("tenant-a"));
        assert!(config.abort_on_unmount);
        assert!(config.verb_cache);
    }

    #[test]
    fn test_from_json() {
        let config = TreatyConfig::from_json_str(r#"{"verbCache": false}"#).unwrap();
        assert!(!config.verb_cache);
        assert_eq!(config.key_prefix, None);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        assert!(TreatyConfig::from_toml_str("keyPrefix = [").is_err());
    }

    #[test]
    fn test_load_missing_file() {
        let err = TreatyConfig::load("/nonexistent/treaty.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
