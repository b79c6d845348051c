// src/fs/mod.rs

//! Path classification: the authoritative "what is at this path now" check.
//!
//! Native watch payloads are approximate, so every change is re-stat'ed before
//! the manager decides what it means. The manager talks to a
//! [`PathClassifier`] instead of `tokio::fs` directly so tests can drive it
//! from an in-memory tree ([`mock::MockFileSystem`]).

use std::fmt::Debug;
use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::pin::Pin;

use tracing::trace;

pub mod mock;

/// Outcome of a single stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Exists and is not a directory (regular files, symlinks to files,
    /// sockets, fifos...).
    File,
    Directory,
    NotFound,
    /// Stat failed for another reason. Treated as removed.
    Failed(io::ErrorKind),
}

impl Classification {
    pub fn from_io_result(res: io::Result<std::fs::Metadata>) -> Self {
        match res {
            Ok(meta) if meta.is_dir() => Classification::Directory,
            Ok(_) => Classification::File,
            Err(err) if err.kind() == io::ErrorKind::NotFound => Classification::NotFound,
            Err(err) => Classification::Failed(err.kind()),
        }
    }

    pub fn is_directory(self) -> bool {
        matches!(self, Classification::Directory)
    }
}

pub type ClassifyFuture = Pin<Box<dyn Future<Output = Classification> + Send + 'static>>;

/// Asynchronously resolves the current status of a path.
pub trait PathClassifier: Send + Sync + Debug {
    fn classify(&self, path: PathBuf) -> ClassifyFuture;
}

/// Classifier backed by `tokio::fs::metadata` (follows symlinks).
#[derive(Debug, Clone, Default)]
pub struct FsClassifier;

impl PathClassifier for FsClassifier {
    fn classify(&self, path: PathBuf) -> ClassifyFuture {
        Box::pin(async move {
            let outcome = Classification::from_io_result(tokio::fs::metadata(&path).await);
            trace!(?path, ?outcome, "classified");
            outcome
        })
    }
}
