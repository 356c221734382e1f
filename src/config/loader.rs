// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; semantic checks happen in
/// `ConfigFile::try_from`.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file from path and validate it.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Resolve the configuration for a run.
///
/// An explicitly named file must exist. When no path was given and the
/// default `Sitepipe.toml` is absent, every default applies.
pub fn load_or_default(explicit: Option<&Path>) -> Result<ConfigFile> {
    match explicit {
        Some(path) => load_and_validate(path),
        None => {
            let path = default_config_path();
            if path.is_file() {
                load_and_validate(&path)
            } else {
                debug!(?path, "no config file found, using defaults");
                ConfigFile::defaults()
            }
        }
    }
}

/// `Sitepipe.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Sitepipe.toml")
}
