//! Client configuration.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str = "https://movie-api-padma-7528be21ca05.herokuapp.com";

pub const ENV_API_URL: &str = "MYFLIX_API_URL";
pub const ENV_SESSION_FILE: &str = "MYFLIX_SESSION_FILE";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {reason}")]
    Read { path: PathBuf, reason: String },

    #[error("config parse error: {0}")]
    Parse(String),
}

/// Top-level client configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub session: SessionSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Base URL of the movie API, without a trailing path.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout covering connect, send and receive.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionSettings {
    /// JSON file holding the session. Unset keeps the session in memory.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: Option<String>,
    /// Log format: json, pretty, or compact. Default: pretty.
    pub format: Option<String>,
    /// Per-module log level filters (e.g., {"myflix_core": "debug", "ureq": "warn"}).
    #[serde(default)]
    pub filters: HashMap<String, String>,
}

impl ClientConfig {
    /// Load from `path`, or fall back to defaults when the file does not
    /// exist. Environment overrides are applied either way.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            load_client_config(path)?
        } else {
            debug!(path = %path.display(), "no config file, using defaults");
            Self::default()
        };
        config.apply_env();
        Ok(config)
    }

    pub fn apply_env(&mut self) {
        if let Ok(url) = env::var(ENV_API_URL) {
            info!("{ENV_API_URL} set, overriding base URL");
            self.api.base_url = url;
        }
        if let Ok(path) = env::var(ENV_SESSION_FILE) {
            info!("{ENV_SESSION_FILE} set, overriding session file");
            self.session.path = Some(PathBuf::from(path));
        }
    }
}

/// Load client configuration from a file path.
///
/// Supports TOML and JSON formats (detected by extension).
pub fn load_client_config(path: &Path) -> Result<ClientConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    parse_config(&content, path.extension().and_then(|e| e.to_str()))
}

fn parse_config(content: &str, ext: Option<&str>) -> Result<ClientConfig, ConfigError> {
    match ext {
        Some("json") => serde_json::from_str(content)
            .map_err(|e| ConfigError::Parse(format!("JSON: {e}"))),
        _ => toml::from_str(content).map_err(|e| ConfigError::Parse(format!("TOML: {e}"))),
    }
}
