use std::collections::HashMap;
use std::ffi::OsString;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use treewatch::fs::Classification;
use treewatch::fs::mock::MockFileSystem;
use treewatch::watch::{RawEventSink, WatchHandle, WatchOptions, WatchPrimitive};
use treewatch::{ChangeKind, DirError};

#[derive(Debug, Default)]
struct Inner {
    /// dir -> (token, sink) for every currently open watch.
    open: HashMap<PathBuf, (u64, RawEventSink)>,
    next_token: u64,
    opened: Vec<PathBuf>,
    closed: Vec<PathBuf>,
    fail_open: HashMap<PathBuf, io::ErrorKind>,
    last_options: Option<WatchOptions>,
}

/// A scriptable native watch backend.
///
/// - records every open/close;
/// - lets a test inject raw events and runtime errors for an open directory;
/// - optionally refuses to open directories missing from a [`MockFileSystem`].
#[derive(Debug, Clone, Default)]
pub struct FakePrimitive {
    inner: Arc<Mutex<Inner>>,
    fs: Option<MockFileSystem>,
}

impl FakePrimitive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens fail with `NotFound` unless `fs` has a directory at the path.
    pub fn backed_by(fs: MockFileSystem) -> Self {
        Self {
            inner: Arc::default(),
            fs: Some(fs),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap()
    }

    /// Make the next opens of `dir` fail with `kind`.
    pub fn fail_open(&self, dir: impl AsRef<Path>, kind: io::ErrorKind) {
        self.lock().fail_open.insert(dir.as_ref().to_path_buf(), kind);
    }

    fn sink(&self, dir: &Path) -> Option<RawEventSink> {
        self.lock().open.get(dir).map(|(_, sink)| sink.clone())
    }

    /// Deliver a raw event as the watch on `dir`. Returns false if `dir`
    /// is not open.
    pub fn emit(&self, dir: impl AsRef<Path>, kind: ChangeKind, name: Option<&str>) -> bool {
        match self.sink(dir.as_ref()) {
            Some(sink) => sink.event(kind, name.map(OsString::from)),
            None => false,
        }
    }

    /// Structural event for the entry `name` in `dir`.
    pub fn structural(&self, dir: impl AsRef<Path>, name: &str) -> bool {
        self.emit(dir, ChangeKind::Structural, Some(name))
    }

    /// Content event for the entry `name` in `dir`.
    pub fn content(&self, dir: impl AsRef<Path>, name: &str) -> bool {
        self.emit(dir, ChangeKind::Content, Some(name))
    }

    /// Report a runtime failure of the watch on `dir`.
    pub fn fail(&self, dir: impl AsRef<Path>, message: &str) -> bool {
        let dir = dir.as_ref();
        match self.sink(dir) {
            Some(sink) => sink.error(DirError::new(dir, io::ErrorKind::Other, message)),
            None => false,
        }
    }

    pub fn is_open(&self, dir: impl AsRef<Path>) -> bool {
        self.lock().open.contains_key(dir.as_ref())
    }

    /// Currently open directories, sorted.
    pub fn open_dirs(&self) -> Vec<PathBuf> {
        let mut dirs: Vec<PathBuf> = self.lock().open.keys().cloned().collect();
        dirs.sort();
        dirs
    }

    /// Every successful open so far, in order.
    pub fn opened(&self) -> Vec<PathBuf> {
        self.lock().opened.clone()
    }

    /// Every close so far, in order.
    pub fn closed(&self) -> Vec<PathBuf> {
        self.lock().closed.clone()
    }

    pub fn last_options(&self) -> Option<WatchOptions> {
        self.lock().last_options
    }
}

impl WatchPrimitive for FakePrimitive {
    fn open(
        &self,
        dir: &Path,
        options: WatchOptions,
        sink: RawEventSink,
    ) -> Result<Box<dyn WatchHandle>, DirError> {
        if let Some(fs) = &self.fs {
            if fs.classify_now(dir) != Classification::Directory {
                return Err(DirError::new(dir, io::ErrorKind::NotFound, "no such directory"));
            }
        }

        let mut inner = self.lock();
        if let Some(kind) = inner.fail_open.get(dir) {
            return Err(DirError::new(dir, *kind, "injected open failure"));
        }
        if inner.open.contains_key(dir) {
            return Err(DirError::new(dir, io::ErrorKind::AlreadyExists, "already open"));
        }

        inner.next_token += 1;
        let token = inner.next_token;
        inner.open.insert(dir.to_path_buf(), (token, sink));
        inner.opened.push(dir.to_path_buf());
        inner.last_options = Some(options);

        Ok(Box::new(FakeHandle {
            dir: dir.to_path_buf(),
            token,
            inner: Arc::clone(&self.inner),
        }))
    }
}

#[derive(Debug)]
struct FakeHandle {
    dir: PathBuf,
    token: u64,
    inner: Arc<Mutex<Inner>>,
}

impl WatchHandle for FakeHandle {
    fn close(self: Box<Self>) {
        let mut inner = self.inner.lock().unwrap();
        if inner.open.get(&self.dir).is_some_and(|(t, _)| *t == self.token) {
            inner.open.remove(&self.dir);
        }
        inner.closed.push(self.dir.clone());
    }
}
