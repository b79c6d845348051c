// src/engine/mod.rs

//! Watch-set manager engine.
//!
//! Every input the manager reacts to (caller commands, native watch
//! callbacks, walker output, rewatch timer ticks) is serialized onto one
//! queue of [`ManagerEvent`]s. A single task drains that queue, so the watch
//! table is never mutated concurrently.
//!
//! - [`core`] holds the synchronous state machine (`ManagerCore::step`).
//! - [`event_handlers`] implements the reaction to each kind of input.
//! - [`runtime`] is the async shell: it owns the queue, runs path
//!   classifications and feeds their results back in submission order.
//! - [`roots`], [`rewatch`] and [`bus`] are the root table, the rewatch
//!   timers and the subscriber fan-out.
//! - [`tombstones`] remembers recently removed directories.

use std::ffi::OsString;
use std::path::PathBuf;

use tokio::sync::oneshot;

use crate::errors::DirError;
use crate::types::{ChangeKind, EventKind, WatchEvent};
use crate::watch::set::EntryId;
use crate::watch::walker::{WalkId, WalkItem};

pub mod bus;
pub mod core;
pub mod event_handlers;
pub mod rewatch;
pub mod roots;
pub mod runtime;
pub mod tombstones;

pub use bus::EventBus;
pub use core::ManagerCore;
pub use event_handlers::{ClassifyJob, CoreCommand, CoreStep};
pub use roots::{RootRecord, RootState, RootTable};
pub use rewatch::RewatchScheduler;
pub use runtime::Runtime;

/// Reply channel for a `watch()` readiness request.
pub type ReadySender = oneshot::Sender<Result<(), DirError>>;

/// Read-only questions about the current watch set.
#[derive(Debug)]
pub enum Query {
    IsWatching(PathBuf, oneshot::Sender<bool>),
    WatchedDirs(oneshot::Sender<Vec<PathBuf>>),
    Roots(oneshot::Sender<Vec<PathBuf>>),
}

/// Everything that flows into the manager's queue.
#[derive(Debug)]
pub enum ManagerEvent {
    Watch {
        paths: Vec<PathBuf>,
        ready: Option<ReadySender>,
    },
    Unwatch {
        paths: Vec<PathBuf>,
    },
    Subscribe {
        kinds: Option<Vec<EventKind>>,
        tx: tokio::sync::mpsc::UnboundedSender<WatchEvent>,
    },
    Query(Query),
    Close {
        done: Option<oneshot::Sender<()>>,
    },
    /// A native watch reported `(kind, name)`; `name` is `None` when the
    /// watched directory itself changed.
    Raw {
        entry: EntryId,
        dir: PathBuf,
        kind: ChangeKind,
        name: Option<OsString>,
    },
    /// A native watch failed at runtime.
    PrimitiveFailed {
        entry: EntryId,
        dir: PathBuf,
        error: DirError,
    },
    Walk {
        walk: WalkId,
        item: WalkItem,
    },
    RewatchTick {
        root: PathBuf,
        generation: u64,
    },
}
