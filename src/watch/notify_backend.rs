// src/watch/notify_backend.rs

//! [`WatchPrimitive`] on top of `notify`.
//!
//! One `RecommendedWatcher` is shared by every open directory (a watcher per
//! directory would exhaust inotify instances on large trees). Each directory
//! is watched with `RecursiveMode::NonRecursive` and registered in a routing
//! table; the notify callback maps every event path back to the sink of
//! the directory that contains it.
//!
//! Routing rules, per event path `p`:
//! - if `parent(p)` is watched, its sink gets `(kind, basename(p))`;
//! - for structural events, if `p` itself is watched, its sink also gets
//!   `(kind, None)`, which is how a root learns it was removed.

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use notify::event::ModifyKind;
use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace, warn};

use crate::errors::{DirError, Result};
use crate::types::ChangeKind;
use crate::watch::primitive::{RawEventSink, WatchHandle, WatchOptions, WatchPrimitive};

type Routes = Arc<Mutex<HashMap<PathBuf, RawEventSink>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

struct Shared {
    watcher: Mutex<RecommendedWatcher>,
    routes: Routes,
}

#[derive(Clone)]
pub struct NotifyPrimitive {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for NotifyPrimitive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyPrimitive")
            .field("watched", &lock(&self.shared.routes).len())
            .finish()
    }
}

impl NotifyPrimitive {
    pub fn new() -> Result<Self> {
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));

        // Called synchronously on notify's own thread.
        let watcher = RecommendedWatcher::new(
            {
                let routes = Arc::clone(&routes);
                move |res: notify::Result<Event>| match res {
                    Ok(event) => route_event(&routes, &event),
                    Err(err) => route_error(&routes, &err),
                }
            },
            Config::default(),
        )?;

        Ok(Self {
            shared: Arc::new(Shared {
                watcher: Mutex::new(watcher),
                routes,
            }),
        })
    }
}

impl WatchPrimitive for NotifyPrimitive {
    fn open(
        &self,
        dir: &Path,
        _options: WatchOptions,
        sink: RawEventSink,
    ) -> std::result::Result<Box<dyn WatchHandle>, DirError> {
        // Backends may report canonical paths (e.g. /private/var on macOS),
        // so route on the canonical form and report with the caller's form.
        let key = dir.canonicalize().map_err(|e| DirError::from_io(dir, &e))?;

        {
            let mut routes = lock(&self.shared.routes);
            if routes.contains_key(&key) {
                return Err(DirError::new(
                    dir,
                    io::ErrorKind::AlreadyExists,
                    format!("already watched as {}", key.display()),
                ));
            }
            // Register before watching so nothing reported in between is lost.
            routes.insert(key.clone(), sink);
        }

        let res = lock(&self.shared.watcher).watch(&key, RecursiveMode::NonRecursive);
        if let Err(err) = res {
            lock(&self.shared.routes).remove(&key);
            return Err(DirError::from_notify(dir, &err));
        }

        trace!(?dir, "native watch opened");
        Ok(Box::new(NotifyHandle {
            key,
            shared: Arc::clone(&self.shared),
        }))
    }
}

struct NotifyHandle {
    key: PathBuf,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for NotifyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyHandle").field("key", &self.key).finish()
    }
}

impl WatchHandle for NotifyHandle {
    fn close(self: Box<Self>) {
        lock(&self.shared.routes).remove(&self.key);
        // Deleted directories lose their kernel watch on their own.
        if let Err(err) = lock(&self.shared.watcher).unwatch(&self.key) {
            debug!(dir = ?self.key, error = %err, "unwatch after close");
        }
    }
}

/// Map notify's vocabulary onto the two raw kinds. Access events are noise.
pub fn change_kind(kind: &EventKind) -> Option<ChangeKind> {
    match kind {
        EventKind::Access(_) => None,
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(ModifyKind::Name(_)) => {
            Some(ChangeKind::Structural)
        }
        EventKind::Modify(_) | EventKind::Any | EventKind::Other => Some(ChangeKind::Content),
    }
}

fn route_event(routes: &Routes, event: &Event) {
    let Some(kind) = change_kind(&event.kind) else {
        return;
    };
    let routes = lock(routes);
    for path in &event.paths {
        if let Some(sink) = path.parent().and_then(|parent| routes.get(parent)) {
            sink.event(kind, path.file_name().map(|n| n.to_os_string()));
        }
        if kind == ChangeKind::Structural {
            if let Some(sink) = routes.get(path) {
                sink.event(kind, None);
            }
        }
    }
}

fn route_error(routes: &Routes, err: &notify::Error) {
    let routes = lock(routes);
    let mut delivered = false;
    for path in &err.paths {
        if let Some(sink) = routes.get(path) {
            sink.error(DirError::from_notify(sink.dir(), err));
            delivered = true;
        }
    }
    if !delivered {
        warn!(error = %err, "native watch error not attributable to a directory");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::ManagerEvent;
    use crate::watch::set::EntryId;
    use notify::event::{AccessKind, CreateKind, DataChange, RemoveKind, RenameMode};
    use tokio::sync::mpsc;

    #[test]
    fn kind_mapping() {
        assert_eq!(change_kind(&EventKind::Access(AccessKind::Any)), None);
        assert_eq!(
            change_kind(&EventKind::Create(CreateKind::File)),
            Some(ChangeKind::Structural)
        );
        assert_eq!(
            change_kind(&EventKind::Remove(RemoveKind::Folder)),
            Some(ChangeKind::Structural)
        );
        assert_eq!(
            change_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::Both))),
            Some(ChangeKind::Structural)
        );
        assert_eq!(
            change_kind(&EventKind::Modify(ModifyKind::Data(DataChange::Content))),
            Some(ChangeKind::Content)
        );
    }

    #[test]
    fn routes_to_parent_and_self() {
        let routes: Routes = Arc::new(Mutex::new(HashMap::new()));
        let (tx, mut rx) = mpsc::unbounded_channel();
        let root = PathBuf::from("/w/root");
        lock(&routes).insert(
            root.clone(),
            RawEventSink::new(EntryId(1), root.clone(), tx.clone()),
        );

        let child = Event::new(EventKind::Create(CreateKind::Folder)).add_path(root.join("a"));
        route_event(&routes, &child);
        let gone = Event::new(EventKind::Remove(RemoveKind::Folder)).add_path(root.clone());
        route_event(&routes, &gone);
        let stray = Event::new(EventKind::Create(CreateKind::File)).add_path("/elsewhere/x".into());
        route_event(&routes, &stray);

        match rx.try_recv().unwrap() {
            ManagerEvent::Raw { dir, kind, name, .. } => {
                assert_eq!(dir, root);
                assert_eq!(kind, ChangeKind::Structural);
                assert_eq!(name.as_deref(), Some(std::ffi::OsStr::new("a")));
            }
            other => panic!("unexpected {other:?}"),
        }
        match rx.try_recv().unwrap() {
            ManagerEvent::Raw { dir, name, .. } => {
                assert_eq!(dir, root);
                assert!(name.is_none());
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(rx.try_recv().is_err());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn reports_file_creation_in_watched_dir() {
        let tmp = tempfile::TempDir::new().unwrap();
        let dir = tmp.path().canonicalize().unwrap();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let primitive = NotifyPrimitive::new().unwrap();
        let handle = primitive
            .open(&dir, WatchOptions::default(), RawEventSink::new(EntryId(1), dir.clone(), tx))
            .unwrap();

        std::fs::write(dir.join("hello.txt"), b"hi").unwrap();

        let ev = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("no native event")
            .unwrap();
        match ev {
            ManagerEvent::Raw { dir: d, name, .. } => {
                assert_eq!(d, dir);
                assert_eq!(name.as_deref(), Some(std::ffi::OsStr::new("hello.txt")));
            }
            other => panic!("unexpected {other:?}"),
        }

        handle.close();
        assert_eq!(lock(&primitive.shared.routes).len(), 0);
    }

    #[test]
    fn opening_the_same_directory_twice_fails() {
        let tmp = tempfile::TempDir::new().unwrap();
        let (tx, _rx) = mpsc::unbounded_channel();
        let primitive = NotifyPrimitive::new().unwrap();
        let sink = RawEventSink::new(EntryId(1), tmp.path().to_path_buf(), tx);
        let _h = primitive.open(tmp.path(), WatchOptions::default(), sink.clone()).unwrap();
        let err = primitive.open(tmp.path(), WatchOptions::default(), sink).unwrap_err();
        assert_eq!(err.kind, io::ErrorKind::AlreadyExists);
    }
}
