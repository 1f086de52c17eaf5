//! Configuration management

use anyhow::{Context, Result};
use deckshot_protocol::DEFAULT_BACKEND_ADDR;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Polls faster than this are clamped
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Backend connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Backend listen address (`host:port`)
    #[serde(default = "default_backend_addr")]
    pub addr: String,
    /// How long one-shot commands wait for the first connection, in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

fn default_backend_addr() -> String {
    DEFAULT_BACKEND_ADDR.to_string()
}
fn default_connect_timeout() -> u64 {
    3000
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            addr: default_backend_addr(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

/// Reconciliation loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollConfig {
    /// Interval between run state queries in milliseconds
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
}

fn default_poll_interval() -> u64 {
    1000
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
        }
    }
}

/// Documentation links
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocsConfig {
    /// Page explaining how to configure Deckshot by hand
    #[serde(default = "default_instructions_url")]
    pub instructions_url: String,
}

fn default_instructions_url() -> String {
    "https://github.com/apognu/deckshot#readme".to_string()
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            instructions_url: default_instructions_url(),
        }
    }
}

/// Main panel configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub docs: DocsConfig,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, falling back to defaults when it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Config::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("com", "deckshot", "DeckshotPanel")
            .context("Failed to determine config directory")?;
        Ok(proj_dirs.config_dir().join("config.toml"))
    }

    /// Get the default configuration embedded in the binary
    pub fn default_config_str() -> &'static str {
        include_str!("../../config/default.toml")
    }

    /// Poll interval, never below [`MIN_POLL_INTERVAL`]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll.interval_ms).max(MIN_POLL_INTERVAL)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.backend.connect_timeout_ms)
    }
}
