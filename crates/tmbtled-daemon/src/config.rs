//! Configuration management.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tmbtled_hw::{DEFAULT_REFRESH_INTERVAL_MS, DEFAULT_TARGET_INTERVAL_MS};

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Unit system: "auto", "metric" or "imperial"
    #[serde(default)]
    pub units: UnitSetting,

    /// Radio link configuration
    #[serde(default)]
    pub link: LinkConfig,

    /// Display configuration
    #[serde(default)]
    pub display: DisplayConfig,
}

/// Radio link configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkConfig {
    /// Directory holding pairing metadata
    #[serde(default = "default_pairing_dir")]
    pub pairing_dir: String,

    /// Delay before scanning again after a disconnect, in milliseconds
    #[serde(default = "default_rescan_delay")]
    pub rescan_delay_ms: u64,

    /// Write loop period before any renegotiation, in milliseconds
    #[serde(default = "default_refresh_interval")]
    pub refresh_interval_ms: f64,

    /// Connection interval requested in performance mode, in milliseconds
    #[serde(default = "default_performance_interval")]
    pub performance_interval_ms: f64,

    /// Give up on a connection attempt after this long, in milliseconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            pairing_dir: default_pairing_dir(),
            rescan_delay_ms: default_rescan_delay(),
            refresh_interval_ms: default_refresh_interval(),
            performance_interval_ms: default_performance_interval(),
            connect_timeout_ms: default_connect_timeout(),
        }
    }
}

/// Display configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayConfig {
    /// How long temporary messages stay up, in milliseconds
    #[serde(default = "default_temporary_duration")]
    pub temporary_duration_ms: u64,

    /// Client update period in milliseconds
    #[serde(default = "default_client_poll")]
    pub client_poll_ms: u64,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            temporary_duration_ms: default_temporary_duration(),
            client_poll_ms: default_client_poll(),
        }
    }
}

// Default value functions
fn default_pairing_dir() -> String {
    "config".to_string()
}

fn default_rescan_delay() -> u64 {
    1000
}

fn default_refresh_interval() -> f64 {
    DEFAULT_REFRESH_INTERVAL_MS
}

fn default_performance_interval() -> f64 {
    DEFAULT_TARGET_INTERVAL_MS
}

fn default_connect_timeout() -> u64 {
    10_000
}

fn default_temporary_duration() -> u64 {
    3000
}

fn default_client_poll() -> u64 {
    16
}

impl Config {
    /// Loads configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content =
            std::fs::read_to_string(path.as_ref()).context("Failed to read configuration file")?;
        let config: Config = toml::from_str(&content).context("Failed to parse configuration")?;
        Ok(config)
    }

    /// Saves configuration to a TOML file.
    #[allow(dead_code)]
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;
        std::fs::write(path.as_ref(), content).context("Failed to write configuration file")?;
        Ok(())
    }
}

/// Measurement system used for rendering values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSystem {
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Picks the unit system from the locale environment.
    pub fn detect() -> Self {
        let locale = ["LC_ALL", "LC_MEASUREMENT", "LANG"]
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|value| !value.is_empty())
            .unwrap_or_default();
        Self::from_locale(&locale)
    }

    fn from_locale(locale: &str) -> Self {
        if locale.starts_with("en_US") {
            UnitSystem::Imperial
        } else {
            UnitSystem::Metric
        }
    }
}

impl std::fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnitSystem::Metric => write!(f, "metric"),
            UnitSystem::Imperial => write!(f, "imperial"),
        }
    }
}

/// Configured unit preference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSetting {
    #[default]
    Auto,
    Metric,
    Imperial,
}

impl UnitSetting {
    /// Resolves the preference to a concrete unit system.
    pub fn resolve(self) -> UnitSystem {
        match self {
            UnitSetting::Auto => UnitSystem::detect(),
            UnitSetting::Metric => UnitSystem::Metric,
            UnitSetting::Imperial => UnitSystem::Imperial,
        }
    }
}
