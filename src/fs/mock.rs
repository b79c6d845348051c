// src/fs/mock.rs

//! In-memory directory tree.
//!
//! Implements both [`PathClassifier`] and [`DirectoryWalker`] so the manager
//! can be exercised without touching the disk. Walks are delivered
//! synchronously and in lexical order, which keeps tests deterministic.

use std::collections::{BTreeMap, HashMap};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use super::{Classification, ClassifyFuture, PathClassifier};
use crate::errors::DirError;
use crate::watch::walker::{DirectoryWalker, WalkRequest, WalkSink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockEntry {
    File,
    Dir,
}

#[derive(Debug, Default)]
struct Inner {
    entries: BTreeMap<PathBuf, MockEntry>,
    stat_failures: HashMap<PathBuf, io::ErrorKind>,
}

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    inner: Arc<Mutex<Inner>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a directory and any missing ancestors.
    pub fn add_dir(&self, path: impl AsRef<Path>) {
        let mut inner = self.lock();
        Self::ensure_dirs(&mut inner.entries, path.as_ref());
    }

    /// Create (or replace) a file, creating missing ancestor directories.
    pub fn add_file(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let mut inner = self.lock();
        if let Some(parent) = path.parent() {
            Self::ensure_dirs(&mut inner.entries, parent);
        }
        // Replacing a directory drops whatever was beneath it.
        inner.entries.retain(|p, _| p == path || !p.starts_with(path));
        inner.entries.insert(path.to_path_buf(), MockEntry::File);
    }

    fn ensure_dirs(entries: &mut BTreeMap<PathBuf, MockEntry>, path: &Path) {
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                continue;
            }
            entries.insert(ancestor.to_path_buf(), MockEntry::Dir);
        }
    }

    /// Remove `path` and everything beneath it.
    pub fn remove(&self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        self.lock().entries.retain(|p, _| !p.starts_with(path));
    }

    /// Make every stat of `path` fail with `kind` until cleared.
    pub fn fail_stat(&self, path: impl AsRef<Path>, kind: io::ErrorKind) {
        self.lock()
            .stat_failures
            .insert(path.as_ref().to_path_buf(), kind);
    }

    pub fn clear_stat_failure(&self, path: impl AsRef<Path>) {
        self.lock().stat_failures.remove(path.as_ref());
    }

    pub fn entry(&self, path: impl AsRef<Path>) -> Option<MockEntry> {
        self.lock().entries.get(path.as_ref()).copied()
    }

    pub fn classify_now(&self, path: &Path) -> Classification {
        let inner = self.lock();
        if let Some(kind) = inner.stat_failures.get(path) {
            return Classification::Failed(*kind);
        }
        match inner.entries.get(path) {
            Some(MockEntry::Dir) => Classification::Directory,
            Some(MockEntry::File) => Classification::File,
            None => Classification::NotFound,
        }
    }

    /// Entries at or below `dir`, in lexical order (parents before children).
    fn entries_under(&self, dir: &Path) -> Vec<(PathBuf, MockEntry)> {
        self.lock()
            .entries
            .range(dir.to_path_buf()..)
            .take_while(|(p, _)| p.starts_with(dir))
            .map(|(p, e)| (p.clone(), *e))
            .collect()
    }
}

impl PathClassifier for MockFileSystem {
    fn classify(&self, path: PathBuf) -> ClassifyFuture {
        let outcome = self.classify_now(&path);
        Box::pin(async move { outcome })
    }
}

impl DirectoryWalker for MockFileSystem {
    fn walk(&self, request: WalkRequest, sink: WalkSink) {
        let WalkRequest {
            dir,
            base,
            filter,
            files,
        } = request;

        match self.entry(&dir) {
            Some(MockEntry::Dir) => {}
            Some(MockEntry::File) => {
                sink.error(DirError::new(&dir, io::ErrorKind::NotADirectory, "not a directory"));
                return;
            }
            None => {
                sink.error(DirError::new(&dir, io::ErrorKind::NotFound, "no such directory"));
                return;
            }
        }

        for (path, kind) in self.entries_under(&dir) {
            if kind == MockEntry::File && !files {
                continue;
            }
            // Pruned if the entry or any ancestor below `dir` is rejected.
            let pruned = path
                .ancestors()
                .take_while(|a| *a != dir)
                .any(|a| filter.rejects(&base, a));
            if pruned {
                continue;
            }
            let delivered = match kind {
                MockEntry::Dir => sink.directory(path),
                MockEntry::File => sink.file(path),
            };
            if !delivered {
                return;
            }
        }
        sink.end();
    }
}
