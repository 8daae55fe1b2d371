//! Configuration for the file monitor.
//!
//! This module provides a layered configuration system that supports:
//! - Default values
//! - TOML configuration file
//! - Environment variable overrides
//! - CLI argument overrides
//!
//! # Environment Variables
//!
//! Environment variables must be prefixed with `FMON_` and use double underscores
//! to separate nested levels:
//! - `FMON_MONITOR__MAX_MONITORS=32` sets `monitor.max_monitors`
//! - `FMON_DAEMON__REARM_INTERVAL_MS=250` sets `daemon.rearm_interval_ms`
//! - `FMON_LOGGING__DEFAULT=debug` sets `logging.default`

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR: &str = ".fmon";
const CONFIG_FILE: &str = "settings.toml";
const ENV_PREFIX: &str = "FMON_";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Settings {
    /// Version of the configuration schema
    #[serde(default = "default_version")]
    pub version: u32,

    /// Registry limits and watch behavior
    #[serde(default)]
    pub monitor: MonitorConfig,

    /// Readiness loop settings for the `fmon` binary
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// Log levels
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Limits of one [`WatchRegistry`](crate::WatchRegistry), fixed at construction.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MonitorConfig {
    /// Maximum number of concurrently monitored paths
    #[serde(default = "default_max_monitors")]
    pub max_monitors: usize,

    /// Paths are stored truncated to this many bytes minus one
    #[serde(default = "default_max_path_length")]
    pub max_path_length: usize,

    /// Bytes read from the watch source per dispatch
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,

    /// Arm every event kind and log each event (routing is unchanged)
    #[serde(default)]
    pub all_events: bool,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DaemonConfig {
    /// How long to wait for events before retrying non-existent paths
    #[serde(default = "default_rearm_interval_ms")]
    pub rearm_interval_ms: u64,

    /// Maximum number of index-file groups
    #[serde(default = "default_max_groups")]
    pub max_groups: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Default level for all modules
    #[serde(default = "default_log_level")]
    pub default: String,

    /// Per-module overrides, e.g. `fmon::monitor = "debug"`
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

// Default value functions
fn default_version() -> u32 { 1 }
fn default_max_monitors() -> usize { 10 }
fn default_max_path_length() -> usize { 256 }
fn default_event_buffer_size() -> usize { 4096 }
fn default_rearm_interval_ms() -> u64 { 1000 }
fn default_max_groups() -> usize { 5 }
fn default_log_level() -> String { "warn".to_string() }

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            monitor: MonitorConfig::default(),
            daemon: DaemonConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            max_monitors: default_max_monitors(),
            max_path_length: default_max_path_length(),
            event_buffer_size: default_event_buffer_size(),
            all_events: false,
        }
    }
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            rearm_interval_ms: default_rearm_interval_ms(),
            max_groups: default_max_groups(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default: default_log_level(),
            modules: HashMap::new(),
        }
    }
}

impl DaemonConfig {
    pub fn rearm_interval(&self) -> Duration {
        Duration::from_millis(self.rearm_interval_ms)
    }
}

impl Settings {
    /// Load configuration from all sources
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config_path = Self::find_workspace_config()
            .unwrap_or_else(|| PathBuf::from(CONFIG_DIR).join(CONFIG_FILE));
        Self::load_from(config_path)
    }

    /// Load configuration using a specific file instead of the discovered one
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, Box<figment::Error>> {
        Figment::new()
            // Start with defaults
            .merge(Serialized::defaults(Settings::default()))
            // Layer in config file if it exists
            .merge(Toml::file(path.as_ref()))
            // Double underscore separates nested levels
            .merge(Env::prefixed(ENV_PREFIX).map(|key| {
                key.as_str().to_lowercase().replace("__", ".").into()
            }))
            .extract()
            .map_err(Box::new)
    }

    /// Find `.fmon/settings.toml` searching from the current directory up to root
    fn find_workspace_config() -> Option<PathBuf> {
        let current = std::env::current_dir().ok()?;

        current
            .ancestors()
            .map(|ancestor| ancestor.join(CONFIG_DIR))
            .find(|dir| dir.is_dir())
            .map(|dir| dir.join(CONFIG_FILE))
    }

    /// Save current configuration to file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), Box<dyn std::error::Error>> {
        let parent = path.as_ref().parent().ok_or("Invalid path")?;
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }

        let toml_string = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_string)?;

        Ok(())
    }

    /// Create a default settings file in `.fmon/` under `root`
    pub fn init_config_file(
        root: impl AsRef<Path>,
        force: bool,
    ) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let config_path = root.as_ref().join(CONFIG_DIR).join(CONFIG_FILE);

        if !force && config_path.exists() {
            return Err("Configuration file already exists. Use --force to overwrite".into());
        }

        Settings::default().save(&config_path)?;
        Ok(config_path)
    }
}
