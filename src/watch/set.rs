// src/watch/set.rs

//! The watch table: directory path -> live native watch.
//!
//! Owned by exactly one manager and only ever touched from its queue. At most
//! one entry exists per path; removing an entry closes its handle, and since
//! closing consumes the handle it can't be released twice.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::trace;

use crate::watch::path_utils::is_within;
use crate::watch::primitive::WatchHandle;

/// Unique identity of one entry, never reused within a manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(pub(crate) u64);

/// One native watch bound to one directory.
pub struct WatchEntry {
    id: EntryId,
    path: PathBuf,
    handle: Box<dyn WatchHandle>,
}

impl fmt::Debug for WatchEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchEntry")
            .field("id", &self.id)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl WatchEntry {
    pub fn new(id: EntryId, path: PathBuf, handle: Box<dyn WatchHandle>) -> Self {
        Self { id, path, handle }
    }

    pub fn id(&self) -> EntryId {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn close(self) {
        trace!(path = ?self.path, "closing watch");
        self.handle.close();
    }
}

#[derive(Debug, Default)]
pub struct WatchSet {
    entries: HashMap<PathBuf, WatchEntry>,
    next_id: u64,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve an id for an entry about to be opened.
    pub fn next_id(&mut self) -> EntryId {
        self.next_id += 1;
        EntryId(self.next_id)
    }

    /// Insert an entry. A duplicate path is a no-op: the existing entry wins
    /// and the rejected entry's handle is closed. Returns whether it was
    /// inserted.
    pub fn insert(&mut self, entry: WatchEntry) -> bool {
        if self.entries.contains_key(&entry.path) {
            entry.close();
            return false;
        }
        self.entries.insert(entry.path.clone(), entry);
        true
    }

    pub fn get(&self, path: &Path) -> Option<&WatchEntry> {
        self.entries.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    /// True if `path` is watched by exactly the entry `id`.
    pub fn is_current(&self, path: &Path, id: EntryId) -> bool {
        self.entries.get(path).is_some_and(|e| e.id == id)
    }

    /// Close and drop the entry for `path`.
    pub fn remove(&mut self, path: &Path) -> bool {
        match self.entries.remove(path) {
            Some(entry) => {
                entry.close();
                true
            }
            None => false,
        }
    }

    /// Close and drop `path` and every entry beneath it. Returns the removed
    /// paths, sorted.
    pub fn retract(&mut self, path: &Path) -> Vec<PathBuf> {
        self.retract_except(path, |_| false)
    }

    /// Like [`retract`](Self::retract), but entries for which `keep` holds
    /// survive.
    pub fn retract_except(&mut self, path: &Path, keep: impl Fn(&Path) -> bool) -> Vec<PathBuf> {
        let mut doomed: Vec<PathBuf> = self
            .entries
            .keys()
            .filter(|p| is_within(path, p) && !keep(p))
            .cloned()
            .collect();
        doomed.sort();
        for p in &doomed {
            if let Some(entry) = self.entries.remove(p) {
                entry.close();
            }
        }
        doomed
    }

    /// Close everything. Returns how many entries were closed.
    pub fn close_all(&mut self) -> usize {
        let count = self.entries.len();
        for (_, entry) in self.entries.drain() {
            entry.close();
        }
        count
    }

    /// Watched paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.entries.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
