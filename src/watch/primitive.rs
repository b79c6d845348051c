// src/watch/primitive.rs

//! The native per-directory watch abstraction.
//!
//! A primitive opens a *non-recursive* watch on one directory and reports
//! `(kind, entry name)` pairs through a [`RawEventSink`]. Recursion is the
//! manager's job, not the primitive's.
//!
//! Production code uses [`NotifyPrimitive`](crate::watch::notify_backend::NotifyPrimitive);
//! tests can provide a fake that records opens/closes and injects events.

use std::ffi::OsString;
use std::fmt::Debug;
use std::path::{Path, PathBuf};

use tokio::sync::mpsc;

use crate::engine::ManagerEvent;
use crate::errors::DirError;
use crate::types::ChangeKind;
use crate::watch::set::EntryId;

/// Options passed to every `open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Whether this watch alone should keep the manager alive.
    ///
    /// Primitives may ignore it, and the notify backend does. The setting
    /// then only takes effect in the manager, which decides whether to keep
    /// running once every watcher handle is dropped.
    pub persistent: bool,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self { persistent: true }
    }
}

/// Where a primitive delivers notifications for one directory.
///
/// Sends never block; they fail silently once the manager is gone.
#[derive(Debug, Clone)]
pub struct RawEventSink {
    entry: EntryId,
    dir: PathBuf,
    tx: mpsc::UnboundedSender<ManagerEvent>,
}

impl RawEventSink {
    pub(crate) fn new(
        entry: EntryId,
        dir: PathBuf,
        tx: mpsc::UnboundedSender<ManagerEvent>,
    ) -> Self {
        Self { entry, dir, tx }
    }

    /// The directory this sink belongs to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Report a change. `name` is the changed entry's basename, or `None`
    /// when the watched directory itself changed.
    ///
    /// Returns false if the manager no longer listens.
    pub fn event(&self, kind: ChangeKind, name: Option<OsString>) -> bool {
        self.tx
            .send(ManagerEvent::Raw {
                entry: self.entry,
                dir: self.dir.clone(),
                kind,
                name,
            })
            .is_ok()
    }

    /// Report a runtime fault of this watch.
    pub fn error(&self, error: DirError) -> bool {
        self.tx
            .send(ManagerEvent::PrimitiveFailed {
                entry: self.entry,
                dir: self.dir.clone(),
                error,
            })
            .is_ok()
    }
}

/// An open native watch. Closing consumes the handle, so it is released
/// exactly once.
pub trait WatchHandle: Send + Debug {
    fn close(self: Box<Self>);
}

pub trait WatchPrimitive: Send + Sync + Debug {
    /// Open a non-recursive watch on `dir`.
    fn open(
        &self,
        dir: &Path,
        options: WatchOptions,
        sink: RawEventSink,
    ) -> Result<Box<dyn WatchHandle>, DirError>;
}
