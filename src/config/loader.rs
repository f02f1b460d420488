// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, Overrides, RawConfigFile};
use crate::errors::{DevloopError, Result};

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load the config, apply command-line overrides, then validate.
///
/// A missing file is only tolerated for the default path (`Devloop.toml`):
/// a project can run devloop purely from CLI flags. A path given explicitly
/// must exist.
pub fn load_and_validate(path: impl AsRef<Path>, overrides: &Overrides) -> Result<ConfigFile> {
    let path = path.as_ref();

    let mut raw = if path.exists() {
        load_from_path(path)?
    } else if path == default_config_path() {
        debug!(?path, "no config file found; using built-in defaults");
        RawConfigFile::default()
    } else {
        return Err(DevloopError::ConfigError(format!(
            "config file {:?} does not exist",
            path
        )));
    };

    overrides.apply(&mut raw);
    ConfigFile::try_from(raw)
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("Devloop.toml")
}
