//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/fieldrelay/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/fieldrelay/` (~/.config/fieldrelay/)
//! - Data: `$XDG_DATA_HOME/fieldrelay/` (~/.local/share/fieldrelay/)
//! - State/Logs: `$XDG_STATE_HOME/fieldrelay/` (~/.local/state/fieldrelay/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_DATA_HOME or ~/.local/share
fn xdg_data_home() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/share"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Event queue storage configuration
    #[serde(default)]
    pub store: StoreConfig,

    /// Report relay configuration
    #[serde(default)]
    pub relay: RelayConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Event queue storage configuration
#[derive(Debug, Deserialize, Default)]
pub struct StoreConfig {
    /// Override path for the SQLite database file
    pub path: Option<PathBuf>,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

/// Report relay configuration
///
/// When enabled, fieldrelay will periodically assemble a device report and
/// push it to the configured webhook endpoint.
#[derive(Debug, Deserialize, Clone)]
pub struct RelayConfig {
    /// Enable/disable the relay worker
    #[serde(default)]
    pub enabled: bool,

    /// Webhook endpoint URL (e.g. `https://hooks.example.com/devices`)
    pub endpoint_url: Option<String>,

    /// Bearer token sent with each report (optional)
    pub auth_token: Option<String>,

    /// Display name included in report headings
    pub device_name: Option<String>,

    /// Events per report (max 50, default 15); the transport has a
    /// message-size limit, excess events wait for the next cycle
    #[serde(default = "default_batch_cap")]
    pub batch_cap: usize,

    /// Seconds between periodic cycles (floor 900)
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint_url: None,
            auth_token: None,
            device_name: None,
            batch_cap: default_batch_cap(),
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl RelayConfig {
    /// Check if the relay is properly configured and enabled
    pub fn is_ready(&self) -> bool {
        self.enabled && self.endpoint_url.is_some()
    }

    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if !self.enabled {
            return Ok(());
        }

        if self.endpoint_url.is_none() {
            return Err(Error::Config(
                "relay.endpoint_url is required when relay is enabled".to_string(),
            ));
        }
        if self.batch_cap == 0 || self.batch_cap > 50 {
            return Err(Error::Config(
                "relay.batch_cap must be between 1 and 50".to_string(),
            ));
        }
        if self.interval_secs < 900 {
            return Err(Error::Config(
                "relay.interval_secs must be at least 900 (15 minutes)".to_string(),
            ));
        }
        Ok(())
    }

    /// Periodic cycle interval as a [`Duration`]
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Report heading name, falling back to a generic default
    pub fn display_name(&self) -> &str {
        self.device_name
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .unwrap_or("Unnamed Device")
    }
}

fn default_batch_cap() -> usize {
    15
}

fn default_interval_secs() -> u64 {
    900
}

fn default_timeout_secs() -> u64 {
    30
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/fieldrelay/config.toml` (~/.config/fieldrelay/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("fieldrelay").join("config.toml")
    }

    /// Returns the data directory path (for the SQLite database)
    ///
    /// `$XDG_DATA_HOME/fieldrelay/` (~/.local/share/fieldrelay/)
    pub fn data_dir() -> PathBuf {
        xdg_data_home().join("fieldrelay")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/fieldrelay/` (~/.local/state/fieldrelay/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("fieldrelay")
    }

    /// Returns the database file path, honoring the `[store] path` override
    ///
    /// Default: `$XDG_DATA_HOME/fieldrelay/queue.db`
    pub fn database_path(&self) -> PathBuf {
        self.store
            .path
            .clone()
            .unwrap_or_else(|| Self::data_dir().join("queue.db"))
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/fieldrelay/fieldrelay.log`
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("fieldrelay.log")
    }

    /// Ensure XDG base directory environment variables are set.
    ///
    /// This is mainly for CLI binaries that want explicit, stable path behavior
    /// before invoking other components that read these env vars.
    pub fn ensure_xdg_env() {
        let home = home_dir();

        if std::env::var("XDG_DATA_HOME").is_err() {
            std::env::set_var("XDG_DATA_HOME", home.join(".local/share"));
        }

        if std::env::var("XDG_STATE_HOME").is_err() {
            std::env::set_var("XDG_STATE_HOME", home.join(".local/state"));
        }

        if std::env::var("XDG_CONFIG_HOME").is_err() {
            std::env::set_var("XDG_CONFIG_HOME", home.join(".config"));
        }
    }
}
