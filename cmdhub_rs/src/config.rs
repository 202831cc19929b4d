//! Configuration file support for cmdhub.
//!
//! Loads optional `config.toml` from `$CMDHUB_CONFIG` or the user config
//! directory (`<config dir>/cmdhub/config.toml`).

use once_cell::sync::OnceCell;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::loader::CollisionPolicy;
use crate::monitor::MonitorStyle;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "CMDHUB_CONFIG";

static CURRENT: OnceCell<HubConfig> = OnceCell::new();

/// Root configuration structure
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// What to do when two modules declare the same command name.
    pub collision_policy: CollisionPolicy,
    pub monitor: MonitorConfig,
}

/// Long-running-operation monitor settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Delay between polls, in milliseconds.
    pub poll_interval_ms: u64,
    pub style: MonitorStyle,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 1000,
            style: MonitorStyle::Dots,
        }
    }
}

impl HubConfig {
    /// Default config file location, if one can be determined.
    pub fn default_path() -> Option<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|dir| dir.join("cmdhub").join("config.toml"))
    }

    /// Load config from the default location.
    /// Returns default config if the file doesn't exist or is invalid.
    pub fn load() -> Self {
        match Self::default_path() {
            Some(path) => Self::load_from_path(&path),
            None => Self::default(),
        }
    }

    /// Process-wide config: the one the host installed, otherwise loaded from
    /// the default location on first use.
    pub fn current() -> &'static HubConfig {
        CURRENT.get_or_init(Self::load)
    }

    /// Make this the process-wide config. Fails, handing the config back, once
    /// a config is already in place.
    pub fn install(self) -> Result<&'static HubConfig, HubConfig> {
        CURRENT.set(self)?;
        Ok(Self::current())
    }

    /// Load config from a specific path.
    pub fn load_from_path(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::debug!(path = %path.display(), "loaded config");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                tracing::warn!("Failed to read {}: {}", path.display(), e);
                Self::default()
            }
        }
    }
}
