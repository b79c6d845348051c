// src/engine/core.rs

//! Synchronous watch-set manager state machine.
//!
//! [`ManagerCore`] consumes one [`ManagerEvent`] at a time and returns a
//! [`CoreStep`] describing what the async shell (`engine::runtime::Runtime`)
//! must do next. It never awaits: walks and native watch opens are started
//! through the injected [`DirectoryWalker`] / [`WatchPrimitive`], and path
//! classifications are handed back to the shell as commands. Results of
//! those re-enter through [`ManagerCore::step`] (walk items) or
//! [`ManagerCore::classified`] (stat outcomes).
//!
//! Because nothing here blocks, the core can be driven step by step in unit
//! tests with an in-memory filesystem and a fake primitive.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use crate::config::WatcherOptions;
use crate::engine::bus::EventBus;
use crate::engine::event_handlers::{ClassifyJob, CoreStep};
use crate::engine::rewatch::RewatchScheduler;
use crate::engine::roots::RootTable;
use crate::engine::tombstones::Tombstones;
use crate::engine::{ManagerEvent, Query, ReadySender};
use crate::errors::DirError;
use crate::fs::Classification;
use crate::watch::patterns::EntryFilter;
use crate::watch::primitive::WatchPrimitive;
use crate::watch::set::WatchSet;
use crate::watch::walker::{DirectoryWalker, WalkId};

/// Why a walk was started; decides what its end or failure means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOrigin {
    /// First walk of a root requested by `watch()`.
    Initial,
    /// Walk of a root that reappeared (or was re-requested) after removal.
    Rewatch,
    /// Walk of a directory created under an already watched tree.
    Growth,
}

#[derive(Debug, Clone)]
pub(super) struct WalkContext {
    pub(super) dir: PathBuf,
    pub(super) owner: PathBuf,
    pub(super) generation: u64,
    pub(super) origin: WalkOrigin,
}

/// A pending `watch()` readiness reply.
#[derive(Debug)]
pub(super) struct Waiter {
    pub(super) pending: HashSet<PathBuf>,
    pub(super) tx: ReadySender,
}

pub struct ManagerCore {
    pub(super) options: WatcherOptions,
    pub(super) filter: EntryFilter,
    pub(super) set: WatchSet,
    pub(super) roots: RootTable,
    pub(super) walks: HashMap<WalkId, WalkContext>,
    pub(super) next_walk: u64,
    pub(super) waiters: Vec<Waiter>,
    /// Directories retracted because they were removed. A later "removed"
    /// report for one of them repeats a removal already emitted.
    pub(super) tombstones: Tombstones,
    pub(super) bus: EventBus,
    pub(super) rewatch: RewatchScheduler,
    pub(super) primitive: Arc<dyn WatchPrimitive>,
    pub(super) walker: Arc<dyn DirectoryWalker>,
    pub(super) tx: mpsc::UnboundedSender<ManagerEvent>,
    pub(super) closed: bool,
}

impl fmt::Debug for ManagerCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerCore")
            .field("options", &self.options)
            .field("watched", &self.set.len())
            .field("roots", &self.roots.paths())
            .field("walks", &self.walks.len())
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

impl ManagerCore {
    /// `tx` must feed the queue this core is driven from: sinks handed to
    /// primitives and walkers, and rewatch timers, post back through it.
    pub fn new(
        options: WatcherOptions,
        filter: EntryFilter,
        primitive: Arc<dyn WatchPrimitive>,
        walker: Arc<dyn DirectoryWalker>,
        tx: mpsc::UnboundedSender<ManagerEvent>,
    ) -> Self {
        let rewatch = RewatchScheduler::new(options.rewatch_interval, tx.clone());
        Self {
            options,
            filter,
            set: WatchSet::new(),
            roots: RootTable::new(),
            walks: HashMap::new(),
            next_walk: 0,
            waiters: Vec::new(),
            tombstones: Tombstones::new(),
            bus: EventBus::new(),
            rewatch,
            primitive,
            walker,
            tx,
            closed: false,
        }
    }

    pub fn options(&self) -> &WatcherOptions {
        &self.options
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn has_subscribers(&mut self) -> bool {
        self.bus.has_subscribers()
    }

    /// Handle a single queued event.
    pub fn step(&mut self, event: ManagerEvent) -> CoreStep {
        if self.closed {
            debug!(?event, "manager closed; dropping event");
            return CoreStep::exit();
        }

        match event {
            ManagerEvent::Watch { paths, ready } => self.watch(paths, ready),
            ManagerEvent::Unwatch { paths } => self.unwatch(paths),
            ManagerEvent::Subscribe { kinds, tx } => {
                self.bus.subscribe(kinds, tx);
                CoreStep::idle()
            }
            ManagerEvent::Query(query) => {
                self.answer(query);
                CoreStep::idle()
            }
            ManagerEvent::Close { done } => {
                self.close();
                if let Some(done) = done {
                    let _ = done.send(());
                }
                CoreStep::exit()
            }
            ManagerEvent::Raw {
                entry,
                dir,
                kind,
                name,
            } => self.on_raw(entry, dir, kind, name),
            ManagerEvent::PrimitiveFailed { entry, dir, error } => {
                self.on_primitive_failed(entry, dir, error)
            }
            ManagerEvent::Walk { walk, item } => self.on_walk(walk, item),
            ManagerEvent::RewatchTick { root, generation } => {
                self.on_rewatch_tick(root, generation)
            }
        }
    }

    /// Continue after a classification requested by an earlier step.
    pub fn classified(&mut self, job: ClassifyJob, outcome: Classification) -> CoreStep {
        if self.closed {
            return CoreStep::exit();
        }
        match job {
            ClassifyJob::Change {
                entry,
                dir,
                kind,
                path,
            } => self.on_change(entry, dir, kind, path, outcome),
            ClassifyJob::RewatchCheck { root, generation } => {
                self.on_rewatch_check(root, generation, outcome)
            }
        }
    }

    fn answer(&self, query: Query) {
        match query {
            Query::IsWatching(path, reply) => {
                let _ = reply.send(self.set.contains(&path));
            }
            Query::WatchedDirs(reply) => {
                let _ = reply.send(self.set.paths());
            }
            Query::Roots(reply) => {
                let _ = reply.send(self.roots.paths());
            }
        }
    }

    /// Tear everything down. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        // Listeners go first so teardown emits nothing.
        self.bus.clear();
        let closed = self.set.close_all();
        self.rewatch.cancel_all();
        self.roots.clear();
        self.walks.clear();
        self.tombstones.clear();
        // Dropping a waiter resolves its `Ready` as closed.
        self.waiters.clear();

        debug!(closed, "manager closed");
    }

    pub(super) fn settle(&mut self, root: &Path, outcome: Result<(), DirError>) {
        let mut kept = Vec::with_capacity(self.waiters.len());
        for mut waiter in self.waiters.drain(..) {
            if !waiter.pending.contains(root) {
                kept.push(waiter);
                continue;
            }
            match &outcome {
                Ok(()) => {
                    waiter.pending.remove(root);
                    if waiter.pending.is_empty() {
                        let _ = waiter.tx.send(Ok(()));
                    } else {
                        kept.push(waiter);
                    }
                }
                Err(err) => {
                    let _ = waiter.tx.send(Err(err.clone()));
                }
            }
        }
        self.waiters = kept;
    }
}
