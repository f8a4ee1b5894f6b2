// src/config/model.rs

use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use shared::constants::{
    COINSTALLER_DLL_NAME, DRIVER_FILE_NAME, DRIVER_INF_NAME, DRIVER_INF_SECTION, DRIVER_NAME,
    STRICT_SIGNING_MIN_BUILD,
};

/// Top-level runtime config
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub driver:  DriverConfig,
    pub signing: SigningConfig,
}

/// Mirror of `installer.toml`; every table is optional
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    #[serde(default)] pub logging: LoggingConfig,
    #[serde(default)] pub driver:  DriverConfig,
    #[serde(default)] pub signing: RawSigningConfig,
}

/// Mirror of the `[logging]` table
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]                   pub enable: bool,
    #[serde(default)]                   pub file:   Option<String>,
    #[serde(default = "default_level")] pub level:  String,
}
fn default_level() -> String { "INFO".into() }

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { enable: false, file: None, level: default_level() }
    }
}

/// Mirror of the `[driver]` table: names of the package files
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Service name, also the entry added to the filter chain
    pub name:        String,
    pub file:        String,
    pub inf:         String,
    pub inf_section: String,
    pub coinstaller: String,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name:        DRIVER_NAME.into(),
            file:        DRIVER_FILE_NAME.into(),
            inf:         DRIVER_INF_NAME.into(),
            inf_section: DRIVER_INF_SECTION.into(),
            coinstaller: COINSTALLER_DLL_NAME.into(),
        }
    }
}

/// Raw `[signing]` table, `timeout` still a humantime string
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RawSigningConfig {
    pub enabled:   bool,
    pub min_build: u32,
    pub command:   String,
    pub args:      Vec<String>,
    pub timeout:   String,
}

impl Default for RawSigningConfig {
    fn default() -> Self {
        Self {
            enabled:   true,
            min_build: STRICT_SIGNING_MIN_BUILD,
            command:   "bcdedit.exe".into(),
            args:      vec!["/set".into(), "testsigning".into(), "on".into()],
            timeout:   "30s".into(),
        }
    }
}

/// Fully-typed signing remediation settings
#[derive(Debug, Clone)]
pub struct SigningConfig {
    pub enabled:   bool,
    /// First build with the stricter signing policy
    pub min_build: u32,
    pub command:   String,
    pub args:      Vec<String>,
    pub timeout:   Duration,
}

impl Default for SigningConfig {
    fn default() -> Self {
        let raw = RawSigningConfig::default();
        Self {
            enabled:   raw.enabled,
            min_build: raw.min_build,
            command:   raw.command,
            args:      raw.args,
            timeout:   Duration::from_secs(30),
        }
    }
}

/// All the ways config loading can go wrong
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid duration '{0}': {1}")]
    InvalidDuration(String, #[source] humantime::DurationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl TryFrom<RawSigningConfig> for SigningConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSigningConfig) -> Result<Self, Self::Error> {
        let timeout = humantime::parse_duration(&raw.timeout)
            .map_err(|e| ConfigError::InvalidDuration(raw.timeout.clone(), e))?;
        Ok(Self {
            enabled:   raw.enabled,
            min_build: raw.min_build,
            command:   raw.command,
            args:      raw.args,
            timeout,
        })
    }
}
