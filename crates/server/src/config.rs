//! Configuration loading from stevedore.toml.

use runtime::Limits;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub limits: LimitsConfig,

    /// Path to the tool declaration file. When unset the gateway starts
    /// with an empty registry and reload requests are rejected.
    #[serde(default)]
    pub tools: Option<PathBuf>,

    /// Tool-execution backends, keyed by name from tool declarations.
    #[serde(default, rename = "backend")]
    pub backends: Vec<BackendConfig>,
}

#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

/// The upstream model endpoint.
#[derive(Debug, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Bearer token for the upstream. Falls back to the
    /// `STEVEDORE_API_KEY` environment variable when unset.
    pub api_key: Option<String>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key: None,
        }
    }
}

impl UpstreamConfig {
    pub fn resolve_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("STEVEDORE_API_KEY").ok())
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitsConfig {
    #[serde(default = "default_round_limit")]
    pub round_limit: u32,
    #[serde(default = "default_tool_timeout_ms")]
    pub tool_timeout_ms: u64,
    #[serde(default = "default_max_concurrent_tools")]
    pub max_concurrent_tools: usize,
    #[serde(default = "default_max_history_turns")]
    pub max_history_turns: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            round_limit: default_round_limit(),
            tool_timeout_ms: default_tool_timeout_ms(),
            max_concurrent_tools: default_max_concurrent_tools(),
            max_history_turns: default_max_history_turns(),
        }
    }
}

impl LimitsConfig {
    pub fn to_limits(&self) -> Limits {
        Limits {
            round_limit: self.round_limit,
            per_call_timeout: Duration::from_millis(self.tool_timeout_ms),
            max_concurrency: self.max_concurrent_tools,
            max_history_turns: self.max_history_turns,
        }
    }
}

/// One HTTP tool server.
#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    pub name: String,
    pub url: String,
}

fn default_listen() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_round_limit() -> u32 {
    8
}

fn default_tool_timeout_ms() -> u64 {
    30_000
}

fn default_max_concurrent_tools() -> usize {
    8
}

fn default_max_history_turns() -> usize {
    256
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML string.
    pub fn parse(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
