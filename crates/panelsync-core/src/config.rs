//! Configuration module for panelsync.
//!
//! Provides typed configuration structs that map to the YAML configuration
//! file, with loading, defaults, and a platform-appropriate default path.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Top-level configuration for panelsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub panel: PanelConfig,
    pub database: DatabaseConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
}

/// External panel endpoint settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelConfig {
    /// Base URL of the panel, e.g. `https://panel.example.com`.
    pub base_url: String,
    /// Application API bearer token. Empty until configured.
    pub api_token: String,
    /// Records requested per page.
    pub page_size: u32,
    /// Per-request timeout in seconds. Bounds a single page fetch so an
    /// unreachable panel fails the run instead of wedging the Running slot.
    pub request_timeout_secs: u64,
}

/// Local mirror database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Sync engine tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// A Running sync-log row older than this is considered abandoned by a
    /// crashed process and is reclaimed (finalized as failed) when the next
    /// run starts.
    pub stale_run_after_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
}

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/panelsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("panelsync")
            .join("config.yaml")
    }
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://panel.example.com".to_string(),
            api_token: String::new(),
            page_size: 50,
            request_timeout_secs: 30,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("panelsync")
                .join("panelsync.db"),
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            stale_run_after_secs: 3600,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
