//! Configuration loading for meshbed.
//!
//! Configuration is loaded from a TOML file (default: `meshbed.toml`). Every section and
//! field is optional.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::CirqueConfig;
use crate::home::{HomeSettings, ResetPolicy};

/// Environment variable that overrides `logs.dir`.
pub const DEVICE_LOG_DIR_ENV: &str = "DEVICE_LOG_DIR";

/// Root configuration for meshbed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HarnessConfig {
    /// Cirque service configuration.
    #[serde(default)]
    pub cirque: CirqueSection,
    /// Polling intervals.
    #[serde(default)]
    pub polling: PollingConfig,
    /// Mesh reset markers and timeouts.
    #[serde(default)]
    pub reset: ResetConfig,
    /// Device log archiving.
    #[serde(default)]
    pub logs: LogsConfig,
}

/// Cirque service configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CirqueSection {
    /// Base URL of the service (default: http://localhost:5000).
    #[serde(default = "default_cirque_url")]
    pub url: String,
    /// Per-request timeout in seconds (default: 300).
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

/// Polling intervals.
#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Interval between role probes in milliseconds (default: 500).
    #[serde(default = "default_role_interval_ms")]
    pub role_interval_ms: u64,
    /// Interval between device log fetches in milliseconds (default: 1000).
    #[serde(default = "default_output_interval_ms")]
    pub output_interval_ms: u64,
}

/// Mesh reset markers and timeouts.
#[derive(Debug, Clone, Deserialize)]
pub struct ResetConfig {
    /// Border agent readiness line.
    #[serde(default = "default_agent_marker")]
    pub agent_marker: String,
    /// Seconds to wait for `agent_marker` (default: 10).
    #[serde(default = "default_agent_timeout_secs")]
    pub agent_timeout_secs: u64,
    /// Server readiness line.
    #[serde(default = "default_server_marker")]
    pub server_marker: String,
    /// Seconds to wait for `server_marker` (default: 15).
    #[serde(default = "default_server_timeout_secs")]
    pub server_timeout_secs: u64,
    /// Seconds a device may take to report `disabled` (default: 10).
    #[serde(default = "default_disabled_timeout_secs")]
    pub disabled_timeout_secs: u64,
}

/// Device log archiving.
#[derive(Debug, Clone, Deserialize)]
pub struct LogsConfig {
    /// Directory device logs are written to. Logs are not archived without one.
    pub dir: Option<PathBuf>,
    /// Archive logs after each run (default: true).
    #[serde(default = "default_save_logs")]
    pub save: bool,
}

// Default value functions
fn default_cirque_url() -> String {
    "http://localhost:5000".to_string()
}

fn default_request_timeout_secs() -> u64 {
    300
}

fn default_role_interval_ms() -> u64 {
    500
}

fn default_output_interval_ms() -> u64 {
    1000
}

fn default_agent_marker() -> String {
    "Border router agent started.".to_string()
}

fn default_agent_timeout_secs() -> u64 {
    10
}

fn default_server_marker() -> String {
    "[SVR] Server Listening...".to_string()
}

fn default_server_timeout_secs() -> u64 {
    15
}

fn default_disabled_timeout_secs() -> u64 {
    10
}

fn default_save_logs() -> bool {
    true
}

impl Default for CirqueSection {
    fn default() -> Self {
        Self {
            url: default_cirque_url(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            role_interval_ms: default_role_interval_ms(),
            output_interval_ms: default_output_interval_ms(),
        }
    }
}

impl Default for ResetConfig {
    fn default() -> Self {
        Self {
            agent_marker: default_agent_marker(),
            agent_timeout_secs: default_agent_timeout_secs(),
            server_marker: default_server_marker(),
            server_timeout_secs: default_server_timeout_secs(),
            disabled_timeout_secs: default_disabled_timeout_secs(),
        }
    }
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            save: default_save_logs(),
        }
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Apply `DEVICE_LOG_DIR` from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply environment overrides read through `lookup`.
    pub fn with_overrides_from(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(dir) = lookup(DEVICE_LOG_DIR_ENV).filter(|d| !d.is_empty()) {
            self.logs.dir = Some(PathBuf::from(dir));
        }
        self
    }

    /// Directory to archive device logs into, if archiving is on.
    pub fn log_dir(&self) -> Option<&Path> {
        if self.logs.save {
            self.logs.dir.as_deref()
        } else {
            None
        }
    }

    /// Cirque client configuration.
    pub fn cirque_config(&self) -> CirqueConfig {
        CirqueConfig {
            base_url: self.cirque.url.clone(),
            request_timeout: Duration::from_secs(self.cirque.request_timeout_secs),
        }
    }

    /// Home session settings.
    pub fn home_settings(&self) -> HomeSettings {
        HomeSettings {
            role_poll_interval: Duration::from_millis(self.polling.role_interval_ms),
            output_poll_interval: Duration::from_millis(self.polling.output_interval_ms),
            reset: ResetPolicy {
                agent_marker: self.reset.agent_marker.clone(),
                agent_timeout: Duration::from_secs(self.reset.agent_timeout_secs),
                server_marker: self.reset.server_marker.clone(),
                server_timeout: Duration::from_secs(self.reset.server_timeout_secs),
                disabled_timeout: Duration::from_secs(self.reset.disabled_timeout_secs),
            },
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
