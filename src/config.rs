//! Configuration management for Vantage.
//!
//! Handles loading configuration from TOML files, with named query
//! configurations, an identity roster, gateway settings, and the polling
//! knobs for impersonated runs.

use crate::error::{Result, VantageError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use url::Url;

/// Main configuration structure for Vantage.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Execution gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Impersonated-run polling and cache settings.
    #[serde(default)]
    pub impersonation: ImpersonationConfig,

    /// Result preview settings.
    #[serde(default)]
    pub preview: PreviewConfig,

    /// Identity roster, keyed by a short user key.
    #[serde(default)]
    pub users: HashMap<String, UserConfig>,

    /// Named query configurations.
    #[serde(default)]
    pub queries: HashMap<String, QueryConfigEntry>,

    /// Default caller key when `--caller` is not given.
    pub caller: Option<String>,
}

/// Execution gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway backend: "http" or "mock".
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Endpoint URL for the HTTP backend.
    pub endpoint: Option<String>,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Name of the environment variable holding a bearer token, if any.
    pub auth_token_env: Option<String>,
}

fn default_backend() -> String {
    "http".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            endpoint: None,
            timeout_secs: default_timeout_secs(),
            auth_token_env: None,
        }
    }
}

impl GatewayConfig {
    /// Validates and returns the configured endpoint URL.
    pub fn endpoint_url(&self) -> Result<Url> {
        let raw = self
            .endpoint
            .as_deref()
            .ok_or_else(|| VantageError::config("missing field 'endpoint' in [gateway]"))?;
        Url::parse(raw)
            .map_err(|e| VantageError::config(format!("Invalid gateway endpoint '{raw}': {e}")))
    }
}

/// Polling and cache settings for impersonated runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpersonationConfig {
    /// Fixed poll interval in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Number of poll attempts before the caller gives up.
    #[serde(default = "default_max_polls")]
    pub max_polls: u32,

    /// Time-to-live for cached run states, in seconds.
    #[serde(default = "default_result_ttl_secs")]
    pub result_ttl_secs: u64,
}

fn default_poll_interval_ms() -> u64 {
    2000
}

fn default_max_polls() -> u32 {
    30
}

fn default_result_ttl_secs() -> u64 {
    300
}

impl Default for ImpersonationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            max_polls: default_max_polls(),
            result_ttl_secs: default_result_ttl_secs(),
        }
    }
}

/// Result preview settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewConfig {
    /// Records per page in the preview table.
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page_size() -> usize {
    10
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
        }
    }
}

/// One entry in the identity roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    /// Backend user id this key refers to.
    pub id: String,

    /// Display name.
    pub name: Option<String>,

    /// Whether the account is active.
    #[serde(default = "default_true")]
    pub active: bool,

    /// Whether this user may enqueue impersonated runs.
    #[serde(default)]
    pub can_impersonate: bool,
}

/// One named query configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfigEntry {
    /// Target object the query reads from.
    pub object: Option<String>,

    /// Query text.
    pub query: String,

    /// Whether the configuration is active.
    #[serde(default = "default_true")]
    pub active: bool,

    /// Predefined parameter bindings (scalars only).
    #[serde(default)]
    pub bindings: HashMap<String, serde_json::Value>,
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Returns the default config file path for the current platform.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("db-vantage")
            .join("config.toml")
    }

    /// Loads configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| VantageError::config(format!("Failed to read config file: {e}")))?;

        Self::parse_toml(&content, path)
    }

    /// Parses configuration from a TOML string.
    fn parse_toml(content: &str, path: &Path) -> Result<Self> {
        toml::from_str(content).map_err(|e| {
            VantageError::config(format!(
                "Configuration error in {}:\n  {}",
                path.display(),
                e
            ))
        })
    }

    /// Gets a named query configuration.
    pub fn get_query(&self, name: &str) -> Option<&QueryConfigEntry> {
        self.queries.get(name)
    }

    /// Gets a user from the roster.
    pub fn get_user(&self, key: &str) -> Option<&UserConfig> {
        self.users.get(key)
    }
}
