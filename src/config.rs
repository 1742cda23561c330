//! Configuration management for rewer
//!
//! Settings live in `~/.config/rewer/config.json`; every field is optional.
//! The API key is never stored here, it only comes from the environment.

use crate::error::RewerError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable holding the model API key.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_API_BASE_URL: &str = "https://api.anthropic.com";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model identifier sent with every request
    pub model: String,
    /// Base URL of the Messages API
    pub api_base_url: String,
    /// Explicit trunk branch; when unset, `main` then `master` is detected
    pub trunk_branch: Option<String>,
    /// Start of the work period printed in the daily report
    pub work_start: String,
    /// End of the work period printed in the daily report
    pub work_end: String,
    /// Optional transport timeout for the model call
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            trunk_branch: None,
            work_start: "11:00".to_string(),
            work_end: "19:00".to_string(),
            request_timeout_secs: None,
        }
    }
}

impl Config {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("rewer"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk and apply environment overrides
    pub fn load() -> Self {
        let config = match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        };
        config.with_overrides(|name| std::env::var(name).ok())
    }

    /// Load config from a specific file, falling back to defaults.
    ///
    /// A file that fails to parse is moved aside to `config.json.corrupt`
    /// so the user can recover it.
    pub fn load_from(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => {
                debug!(path = %path.display(), "no config file, using defaults");
                return Self::default();
            }
        };

        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!(
                    "Config file was corrupted ({}). A backup was saved and defaults were loaded.",
                    err
                );
                Self::default()
            }
        }
    }

    /// Apply `REWER_*` overrides read through `lookup`.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(model) = non_empty("REWER_MODEL") {
            self.model = model;
        }
        if let Some(url) = non_empty("REWER_API_BASE_URL") {
            self.api_base_url = url;
        }
        if let Some(trunk) = non_empty("REWER_TRUNK") {
            self.trunk_branch = Some(trunk);
        }
        self
    }
}

/// The credential the model collaborator needs.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Read the API key through `lookup`, usually the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RewerError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match lookup(API_KEY_VAR) {
            Some(key) if !key.trim().is_empty() => Ok(Self {
                api_key: key.trim().to_string(),
            }),
            _ => Err(RewerError::MissingCredential { var: API_KEY_VAR }),
        }
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .finish()
    }
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.work_start, "11:00");
        assert_eq!(config.work_end, "19:00");
        assert!(config.trunk_branch.is_none());
    }

    #[test]
    fn test_missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"trunk_branch": "develop", "work_end": "18:30"}"#).unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config.trunk_branch.as_deref(), Some("develop"));
        assert_eq!(config.work_end, "18:30");
        assert_eq!(config.model, DEFAULT_MODEL);
    }

    #[test]
    fn test_corrupt_file_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());
        assert!(dir.path().join("config.json.corrupt").exists());
    }

    #[test]
    fn test_env_overrides() {
        let vars = env(&[("REWER_MODEL", "claude-test"), ("REWER_TRUNK", "trunk"), ("REWER_API_BASE_URL", " ")]);
        let config = Config::default().with_overrides(|k| vars.get(k).cloned());
        assert_eq!(config.model, "claude-test");
        assert_eq!(config.trunk_branch.as_deref(), Some("trunk"));
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
    }

    #[test]
    fn test_credentials_require_non_empty_key() {
        let vars = env(&[(API_KEY_VAR, "")]);
        let err = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap_err();
        assert!(matches!(err, RewerError::MissingCredential { .. }));

        let vars = env(&[(API_KEY_VAR, "sk-ant-123")]);
        let creds = Credentials::from_lookup(|k| vars.get(k).cloned()).unwrap();
        assert_eq!(creds.api_key(), "sk-ant-123");
        assert!(!format!("{:?}", creds).contains("sk-ant-123"));
    }
}
