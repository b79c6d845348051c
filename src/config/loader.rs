// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, WatcherOptions};
use crate::errors::Result;

/// Read and deserialize a configuration file.
///
/// Only TOML parsing happens here; values such as durations and globs are
/// checked by [`load_and_validate`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let config: ConfigFile = toml::from_str(&contents)?;
    Ok(config)
}

/// Load a configuration file and validate it into [`WatcherOptions`].
///
/// Returns the file model as well, for the keys that are not watcher
/// options (`paths`).
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<(ConfigFile, WatcherOptions)> {
    let config = load_from_path(&path)?;
    let options = WatcherOptions::try_from(&config)?;
    Ok((config, options))
}

/// `Treewatch.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Treewatch.toml")
}
