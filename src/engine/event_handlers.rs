// src/engine/event_handlers.rs

//! Reactions of the manager core to each kind of input.

use std::collections::HashSet;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, trace, warn};

use crate::engine::ReadySender;
use crate::engine::core::{ManagerCore, WalkContext, WalkOrigin, Waiter};
use crate::engine::roots::RootState;
use crate::errors::DirError;
use crate::fs::Classification;
use crate::types::{ChangeEvent, ChangeKind, WatchEvent};
use crate::watch::path_utils::is_within;
use crate::watch::primitive::{RawEventSink, WatchOptions};
use crate::watch::set::{EntryId, WatchEntry};
use crate::watch::walker::{WalkId, WalkItem, WalkRequest, WalkSink};

/// A stat the shell must perform and feed back via `ManagerCore::classified`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassifyJob {
    /// A raw notification for `path`, reported by the entry `entry` on `dir`.
    Change {
        entry: EntryId,
        dir: PathBuf,
        kind: ChangeKind,
        path: PathBuf,
    },
    /// Has the vanished root come back?
    RewatchCheck { root: PathBuf, generation: u64 },
}

impl ClassifyJob {
    pub fn path(&self) -> &Path {
        match self {
            ClassifyJob::Change { path, .. } => path,
            ClassifyJob::RewatchCheck { root, .. } => root,
        }
    }
}

/// Command produced by the core, to be executed by the async shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreCommand {
    Classify(ClassifyJob),
}

/// Decision returned by the core after handling one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreStep {
    pub commands: Vec<CoreCommand>,
    /// Whether the shell loop should keep running.
    pub keep_running: bool,
}

impl CoreStep {
    pub fn idle() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: true,
        }
    }

    pub fn classify(job: ClassifyJob) -> Self {
        Self {
            commands: vec![CoreCommand::Classify(job)],
            keep_running: true,
        }
    }

    pub fn exit() -> Self {
        Self {
            commands: Vec::new(),
            keep_running: false,
        }
    }
}

impl ManagerCore {
    // ----- caller commands -------------------------------------------------

    pub(super) fn watch(&mut self, paths: Vec<PathBuf>, ready: Option<ReadySender>) -> CoreStep {
        let mut pending = HashSet::new();

        for path in paths {
            match self.roots.get(&path).map(|r| r.state) {
                Some(RootState::Watched) => {
                    debug!(root = ?path, "already watched");
                }
                Some(RootState::Walking) => {
                    pending.insert(path);
                }
                Some(RootState::Waiting) => {
                    // Explicit request: try now instead of waiting for a tick.
                    self.rewatch.cancel(&path);
                    if let Some(generation) = self.roots.transition(&path, RootState::Walking) {
                        let owner = path.clone();
                        self.start_walk(path.clone(), owner, generation, WalkOrigin::Rewatch);
                    }
                    pending.insert(path);
                }
                None => {
                    info!(root = ?path, "watching root");
                    let generation = self.roots.insert(path.clone());
                    self.start_walk(path.clone(), path.clone(), generation, WalkOrigin::Initial);
                    pending.insert(path);
                }
            }
        }

        if let Some(tx) = ready {
            if pending.is_empty() {
                let _ = tx.send(Ok(()));
            } else {
                self.waiters.push(Waiter { pending, tx });
            }
        }
        CoreStep::idle()
    }

    pub(super) fn unwatch(&mut self, paths: Vec<PathBuf>) -> CoreStep {
        for path in paths {
            let Some(record) = self.roots.remove(&path) else {
                debug!(path = ?path, "unwatch of a path that is not a root");
                continue;
            };
            self.rewatch.cancel(&path);
            self.walks.retain(|_, w| w.owner != path);

            // Directories still covered by another root stay watched.
            let roots = &self.roots;
            let removed = self
                .set
                .retract_except(&path, |p| roots.owner_of(p).is_some());
            info!(root = ?path, closed = removed.len(), "root unwatched");

            self.settle(
                &path,
                Err(DirError::new(
                    &path,
                    io::ErrorKind::Interrupted,
                    "unwatched before the initial walk finished",
                )),
            );
            // Only a root that finished its walk was ever announced.
            if record.state == RootState::Watched {
                self.bus.emit(WatchEvent::Unwatch(path));
            }
        }
        CoreStep::idle()
    }

    // ----- native watch input ----------------------------------------------

    pub(super) fn on_raw(
        &mut self,
        entry: EntryId,
        dir: PathBuf,
        kind: ChangeKind,
        name: Option<OsString>,
    ) -> CoreStep {
        if !self.set.is_current(&dir, entry) {
            trace!(?dir, "event from a retired watch");
            return CoreStep::idle();
        }

        let path = match name {
            Some(name) => {
                if self.filter.is_hidden_name(&name) {
                    trace!(?dir, ?name, "hidden entry ignored");
                    return CoreStep::idle();
                }
                dir.join(name)
            }
            // A directory reporting on itself: only roots have no watched
            // parent to report for them.
            None if self.roots.contains(&dir) => dir.clone(),
            None => return CoreStep::idle(),
        };

        if let Some(owner) = self.roots.owner_of(&path) {
            if self.filter.is_excluded(owner, &path) {
                trace!(?path, "excluded entry ignored");
                return CoreStep::idle();
            }
        }

        CoreStep::classify(ClassifyJob::Change {
            entry,
            dir,
            kind,
            path,
        })
    }

    pub(super) fn on_change(
        &mut self,
        entry: EntryId,
        dir: PathBuf,
        kind: ChangeKind,
        path: PathBuf,
        outcome: Classification,
    ) -> CoreStep {
        // The reporting watch may have been retired while we were stat'ing.
        if !self.set.is_current(&dir, entry) {
            trace!(?path, "late classification dropped");
            return CoreStep::idle();
        }

        let mut change = ChangeEvent::from_classification(kind, &path, &outcome);

        if change.removed && kind == ChangeKind::Content {
            trace!(?path, "content change on a removed path suppressed");
            return CoreStep::idle();
        }
        if let Classification::Failed(err) = outcome {
            warn!(?path, ?err, "stat failed; reporting as removed");
        }

        if change.removed {
            if self.set.contains(&path) {
                change = change.as_removed_directory();
                self.retract(&path, true);
            } else if self.tombstones.contains(&path) {
                trace!(?path, "repeated removal of a retracted directory");
                return CoreStep::idle();
            }
        } else {
            self.tombstones.remove(&path);
            if change.is_directory && !self.set.contains(&path) {
                self.grow(&path);
            } else if change.is_file && self.set.contains(&path) {
                debug!(?path, "watched directory became a file");
                self.retract(&path, false);
            }
        }

        debug!(kind = %change.kind, ?path, removed = change.removed, "change");
        self.bus.emit(WatchEvent::All(change.clone()));
        self.bus.emit(WatchEvent::specific(change));
        CoreStep::idle()
    }

    pub(super) fn on_primitive_failed(
        &mut self,
        entry: EntryId,
        dir: PathBuf,
        error: DirError,
    ) -> CoreStep {
        if !self.set.is_current(&dir, entry) {
            trace!(?dir, "error from a retired watch");
            return CoreStep::idle();
        }
        warn!(?dir, %error, "native watch failed");
        self.retract(&dir, false);
        self.bus.emit(WatchEvent::Error(error));
        CoreStep::idle()
    }

    // ----- walks -----------------------------------------------------------

    pub(super) fn start_walk(
        &mut self,
        dir: PathBuf,
        owner: PathBuf,
        generation: u64,
        origin: WalkOrigin,
    ) {
        self.next_walk += 1;
        let id = WalkId(self.next_walk);
        debug!(?dir, ?origin, "walk started");

        let request = WalkRequest {
            dir: dir.clone(),
            base: owner.clone(),
            filter: self.filter.clone(),
            files: origin == WalkOrigin::Growth,
        };
        self.walks.insert(
            id,
            WalkContext {
                dir,
                owner,
                generation,
                origin,
            },
        );
        self.walker.walk(request, WalkSink::new(id, self.tx.clone()));
    }

    /// A directory appeared under a watched tree: walk it as part of its
    /// owning root.
    fn grow(&mut self, path: &Path) {
        let Some(owner) = self.roots.owner_of(path).map(Path::to_path_buf) else {
            return;
        };
        let Some(generation) = self.roots.get(&owner).map(|r| r.generation) else {
            return;
        };
        self.start_walk(path.to_path_buf(), owner, generation, WalkOrigin::Growth);
    }

    pub(super) fn on_walk(&mut self, walk: WalkId, item: WalkItem) -> CoreStep {
        let Some(ctx) = self.walks.get(&walk).cloned() else {
            return CoreStep::idle();
        };
        if !self.roots.is_current(&ctx.owner, ctx.generation) {
            trace!(dir = ?ctx.dir, "stale walk dropped");
            self.walks.remove(&walk);
            return CoreStep::idle();
        }

        match item {
            WalkItem::Directory(path) => {
                if self.filter.rejects(&ctx.owner, &path) || self.set.contains(&path) {
                    return CoreStep::idle();
                }
                match self.open_entry(&path) {
                    // The start of a growth walk was already reported by the
                    // change that triggered it.
                    Ok(()) if ctx.origin == WalkOrigin::Growth && path != ctx.dir => {
                        return self.discovered(path);
                    }
                    Ok(()) => {}
                    Err(err) if path == ctx.dir && ctx.origin != WalkOrigin::Growth => {
                        self.walks.remove(&walk);
                        self.walk_failed(&ctx, err);
                    }
                    Err(err) => {
                        warn!(dir = ?path, %err, "skipping directory that could not be watched");
                    }
                }
            }
            WalkItem::File(path) => {
                if ctx.origin == WalkOrigin::Growth && !self.filter.rejects(&ctx.owner, &path) {
                    return self.discovered(path);
                }
            }
            WalkItem::End => {
                self.walks.remove(&walk);
                if ctx.origin != WalkOrigin::Growth {
                    self.root_ready(&ctx.owner);
                }
            }
            WalkItem::Error(err) => {
                self.walks.remove(&walk);
                if ctx.origin == WalkOrigin::Growth {
                    debug!(dir = ?ctx.dir, %err, "growth walk failed");
                } else {
                    self.walk_failed(&ctx, err);
                }
            }
        }
        CoreStep::idle()
    }

    /// An entry found inside a newly appeared directory. It may have been
    /// created before that directory was watched, so report it as if its
    /// parent's watch had seen it arrive.
    fn discovered(&self, path: PathBuf) -> CoreStep {
        let Some(dir) = path.parent().map(Path::to_path_buf) else {
            return CoreStep::idle();
        };
        let Some(entry) = self.set.get(&dir).map(|e| e.id()) else {
            trace!(?path, "parent not watched; entry skipped");
            return CoreStep::idle();
        };
        CoreStep::classify(ClassifyJob::Change {
            entry,
            dir,
            kind: ChangeKind::Structural,
            path,
        })
    }

    fn open_entry(&mut self, path: &Path) -> Result<(), DirError> {
        let id = self.set.next_id();
        let sink = RawEventSink::new(id, path.to_path_buf(), self.tx.clone());
        let options = WatchOptions {
            persistent: self.options.persistent,
        };
        let handle = self.primitive.open(path, options, sink)?;
        self.tombstones.remove(path);
        self.set.insert(WatchEntry::new(id, path.to_path_buf(), handle));
        trace!(?path, "watching directory");
        Ok(())
    }

    fn root_ready(&mut self, root: &Path) {
        self.roots.set_state(root, RootState::Watched);
        self.rewatch.cancel(root);
        info!(?root, "root watched");
        self.bus.emit(WatchEvent::Watch(root.to_path_buf()));
        self.settle(root, Ok(()));
    }

    fn walk_failed(&mut self, ctx: &WalkContext, err: DirError) {
        let root = &ctx.owner;
        match ctx.origin {
            WalkOrigin::Initial => {
                warn!(?root, %err, "root could not be watched");
                self.roots.remove(root);
                let roots = &self.roots;
                self.set.retract_except(root, |p| roots.owner_of(p).is_some());
                self.settle(root, Err(err.clone()));
                self.bus.emit(WatchEvent::WatchError(err));
            }
            WalkOrigin::Rewatch => {
                debug!(?root, %err, "rewatch attempt failed");
                self.set.retract(root);
                if let Some(generation) = self.roots.transition(root, RootState::Waiting) {
                    self.rewatch.arm(root, generation);
                }
                self.settle(root, Err(err));
            }
            WalkOrigin::Growth => {}
        }
    }

    // ----- teardown --------------------------------------------------------

    /// Retract `path` and its subtree. Roots inside it are torn down.
    /// `removed` records the retracted paths as known removals.
    fn retract(&mut self, path: &Path, removed: bool) {
        let closed = self.set.retract(path);
        debug!(?path, closed = closed.len(), "subtree retracted");
        if removed {
            self.tombstones.extend(closed);
        }
        self.walks
            .retain(|_, w| w.origin != WalkOrigin::Growth || !is_within(path, &w.dir));
        for root in self.roots.within(path) {
            self.root_lost(&root);
        }
    }

    /// A root's own watch went away without the caller asking.
    fn root_lost(&mut self, root: &Path) {
        let Some(state) = self.roots.get(root).map(|r| r.state) else {
            return;
        };
        if state == RootState::Waiting {
            return;
        }

        info!(?root, "root torn down");
        self.bus.emit(WatchEvent::Unwatch(root.to_path_buf()));
        self.settle(
            root,
            Err(DirError::new(root, io::ErrorKind::NotFound, "root removed while walking")),
        );

        if self.rewatch.is_enabled() {
            if let Some(generation) = self.roots.transition(root, RootState::Waiting) {
                self.rewatch.arm(root, generation);
            }
        } else {
            self.roots.remove(root);
        }
    }

    // ----- rewatch ---------------------------------------------------------

    pub(super) fn on_rewatch_tick(&mut self, root: PathBuf, generation: u64) -> CoreStep {
        match self.roots.get(&root) {
            Some(r) if r.generation == generation && r.state == RootState::Waiting => {
                trace!(?root, "rewatch check");
                CoreStep::classify(ClassifyJob::RewatchCheck { root, generation })
            }
            _ => CoreStep::idle(),
        }
    }

    pub(super) fn on_rewatch_check(
        &mut self,
        root: PathBuf,
        generation: u64,
        outcome: Classification,
    ) -> CoreStep {
        let waiting = self
            .roots
            .get(&root)
            .is_some_and(|r| r.generation == generation && r.state == RootState::Waiting);
        if !waiting {
            return CoreStep::idle();
        }
        if !outcome.is_directory() {
            trace!(?root, ?outcome, "root still missing");
            return CoreStep::idle();
        }

        info!(?root, "root reappeared; rewatching");
        self.rewatch.cancel(&root);
        if let Some(generation) = self.roots.transition(&root, RootState::Walking) {
            self.start_walk(root.clone(), root, generation, WalkOrigin::Rewatch);
        }
        CoreStep::idle()
    }
}
