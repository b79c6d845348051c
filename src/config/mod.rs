// src/config/mod.rs

//! Configuration for treewatch.
//!
//! - `model.rs`: the TOML-backed file model and the runtime [`WatcherOptions`].
//! - `loader.rs`: read a config file from disk.
//! - `validate.rs`: turn a file model into checked options.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, WatcherOptions};
pub use validate::parse_duration;
