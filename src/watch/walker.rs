// src/watch/walker.rs

//! Directory enumeration.
//!
//! A walker visits every directory under a starting point (the start
//! included) and streams them to the manager as [`WalkItem`]s, terminated by
//! `End`, or by a single `Error` if the start itself is inaccessible.
//! Problems below the start only skip the affected subtree.

use std::fmt::Debug;
use std::io;
use std::path::PathBuf;

use tokio::sync::mpsc;
use tracing::debug;
use walkdir::WalkDir;

use crate::engine::ManagerEvent;
use crate::errors::DirError;
use crate::watch::patterns::EntryFilter;

/// Identifies one walk invocation inside the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WalkId(pub(crate) u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkItem {
    Directory(PathBuf),
    /// A non-directory entry; only reported when the request asks for them.
    File(PathBuf),
    Error(DirError),
    End,
}

/// What to walk.
#[derive(Debug, Clone)]
pub struct WalkRequest {
    /// Where traversal starts.
    pub dir: PathBuf,
    /// The owning root; filter rules are evaluated relative to it.
    pub base: PathBuf,
    pub filter: EntryFilter,
    /// Also report visible non-directory entries. Used when walking a
    /// directory that just appeared, whose contents may predate its watch.
    pub files: bool,
}

/// Delivery side of a walk.
#[derive(Debug, Clone)]
pub struct WalkSink {
    walk: WalkId,
    tx: mpsc::UnboundedSender<ManagerEvent>,
}

impl WalkSink {
    pub(crate) fn new(walk: WalkId, tx: mpsc::UnboundedSender<ManagerEvent>) -> Self {
        Self { walk, tx }
    }

    fn send(&self, item: WalkItem) -> bool {
        self.tx
            .send(ManagerEvent::Walk {
                walk: self.walk,
                item,
            })
            .is_ok()
    }

    /// Returns false once the manager is gone; walkers should stop then.
    pub fn directory(&self, path: PathBuf) -> bool {
        self.send(WalkItem::Directory(path))
    }

    pub fn file(&self, path: PathBuf) -> bool {
        self.send(WalkItem::File(path))
    }

    pub fn error(&self, error: DirError) {
        self.send(WalkItem::Error(error));
    }

    pub fn end(&self) {
        self.send(WalkItem::End);
    }
}

pub trait DirectoryWalker: Send + Sync + Debug {
    /// Start a walk. Must not block the caller.
    fn walk(&self, request: WalkRequest, sink: WalkSink);
}

/// Walker backed by `walkdir`, run on the blocking pool.
#[derive(Debug, Clone, Default)]
pub struct WalkdirWalker;

impl DirectoryWalker for WalkdirWalker {
    fn walk(&self, request: WalkRequest, sink: WalkSink) {
        tokio::task::spawn_blocking(move || walk_blocking(request, sink));
    }
}

fn walk_blocking(request: WalkRequest, sink: WalkSink) {
    let WalkRequest {
        dir,
        base,
        filter,
        files,
    } = request;

    let entries = WalkDir::new(&dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| {
            let wanted = files || e.file_type().is_dir();
            e.depth() == 0 || (wanted && !filter.rejects(&base, e.path()))
        });

    for entry in entries {
        match entry {
            Ok(entry) => {
                let is_dir = entry.file_type().is_dir();
                if entry.depth() == 0 && !is_dir {
                    sink.error(DirError::new(
                        &dir,
                        io::ErrorKind::NotADirectory,
                        "not a directory",
                    ));
                    return;
                }
                let delivered = if is_dir {
                    sink.directory(entry.into_path())
                } else {
                    sink.file(entry.into_path())
                };
                if !delivered {
                    return;
                }
            }
            Err(err) if err.depth() == 0 => {
                let kind = err.io_error().map_or(io::ErrorKind::Other, io::Error::kind);
                sink.error(DirError::new(&dir, kind, err.to_string()));
                return;
            }
            Err(err) => {
                debug!(root = ?dir, error = %err, "skipping unreadable subtree");
            }
        }
    }

    sink.end();
}
