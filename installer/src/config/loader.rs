// src/config/loader.rs

//! # Configuration Loader
//!
//! Reads `installer.toml` and turns it into a typed [`Config`]. The file is
//! optional: every table falls back to the stock UsbDk package layout.

use log::Level;
use std::{fs, io::ErrorKind, path::Path};

use crate::installer_log;
use super::model::{Config, ConfigError, RawConfig};

/// Parse configuration text.
pub fn parse(txt: &str) -> Result<Config, ConfigError> {
    let raw: RawConfig = toml::from_str(txt)?;
    Ok(Config {
        logging: raw.logging,
        driver:  raw.driver,
        signing: raw.signing.try_into()?,
    })
}

/// Load and parse the configuration at `path`.
pub fn load(path: &Path) -> Result<Config, ConfigError> {
    installer_log!(Level::Debug, "config", "Reading config from {:?}", path);
    let cfg = parse(&fs::read_to_string(path)?)?;
    installer_log!(Level::Info, "config", "Loaded config from {:?}", path);
    Ok(cfg)
}

/// Like [`load`], but a missing file yields the defaults.
pub fn load_or_default(path: &Path) -> Result<Config, ConfigError> {
    match load(path) {
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => Ok(Config::default()),
        other => other,
    }
}
