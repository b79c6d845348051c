// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreewatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Notify error: {0}")]
    NotifyError(#[from] notify::Error),

    #[error("Invalid exclude pattern: {0}")]
    PatternError(#[from] globset::Error),

    #[error(transparent)]
    Dir(#[from] DirError),

    #[error("watcher is closed")]
    Closed,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// A failure tied to one directory.
///
/// Carried by `watch-error` (with the offending root) and `error` (with the
/// directory whose watch failed).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message} (dir: {})", dir.display())]
pub struct DirError {
    pub dir: PathBuf,
    pub kind: io::ErrorKind,
    pub message: String,
}

impl DirError {
    pub fn new(dir: impl Into<PathBuf>, kind: io::ErrorKind, message: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_io(dir: impl Into<PathBuf>, err: &io::Error) -> Self {
        Self::new(dir, err.kind(), err.to_string())
    }

    pub fn from_notify(dir: impl Into<PathBuf>, err: &notify::Error) -> Self {
        let kind = match &err.kind {
            notify::ErrorKind::Io(io) => io.kind(),
            notify::ErrorKind::PathNotFound => io::ErrorKind::NotFound,
            notify::ErrorKind::MaxFilesWatch => io::ErrorKind::OutOfMemory,
            _ => io::ErrorKind::Other,
        };
        Self::new(dir, kind, err.to_string())
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, TreewatchError>;
