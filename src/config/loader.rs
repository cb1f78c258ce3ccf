// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{EngineConfig, RawEngineConfig};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw
/// `RawEngineConfig`.
///
/// This only performs TOML deserialization; use [`load_and_validate`] for
/// semantic checks.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawEngineConfig> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: RawEngineConfig = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let raw = load_from_path(&path)?;
    EngineConfig::try_from(raw)
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
///
/// The config file is optional for the binary; a file that exists but does
/// not parse is still an error.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<EngineConfig> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "no config file found; using defaults");
        return Ok(EngineConfig::default());
    }
    load_and_validate(path)
}

/// Default config location: `Flowdag.toml` in the working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Flowdag.toml")
}
