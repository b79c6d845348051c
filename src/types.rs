// src/types.rs

//! Event vocabulary shared by the manager, the public handle and subscribers.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::errors::DirError;
use crate::fs::Classification;

/// Raw notification class reported by a native watch.
///
/// Native APIs disagree on vocabulary, so everything collapses into two kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChangeKind {
    /// A name or existence change: create, remove, rename.
    Structural,
    /// Data changed in place.
    Content,
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChangeKind::Structural => f.write_str("rename"),
            ChangeKind::Content => f.write_str("change"),
        }
    }
}

/// A normalized change, built from a single classification snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
    pub is_file: bool,
    pub is_directory: bool,
    pub removed: bool,
}

impl ChangeEvent {
    /// Build an event from the outcome of classifying `path`.
    ///
    /// Any failure, not only "not found", marks the event as removed.
    pub fn from_classification(
        kind: ChangeKind,
        path: impl Into<PathBuf>,
        classification: &Classification,
    ) -> Self {
        let (is_file, is_directory, removed) = match classification {
            Classification::File => (true, false, false),
            Classification::Directory => (false, true, false),
            Classification::NotFound | Classification::Failed(_) => (false, false, true),
        };
        Self {
            kind,
            path: path.into(),
            is_file,
            is_directory,
            removed,
        }
    }

    /// Re-label a removed event as a directory removal.
    ///
    /// Used when the removed path had a watch entry, which only directories get.
    pub(crate) fn as_removed_directory(mut self) -> Self {
        self.is_file = false;
        self.is_directory = true;
        self
    }

    /// The single specific kind (`remove`, `file` or `dir`) this event maps to.
    pub fn specific_kind(&self) -> EventKind {
        if self.removed {
            EventKind::Remove
        } else if self.is_directory {
            EventKind::Dir
        } else {
            EventKind::File
        }
    }
}

/// Closed set of event kinds a subscriber can filter on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    All,
    File,
    Dir,
    Remove,
    Watch,
    Unwatch,
    WatchError,
    Error,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::All => "all",
            EventKind::File => "file",
            EventKind::Dir => "dir",
            EventKind::Remove => "remove",
            EventKind::Watch => "watch",
            EventKind::Unwatch => "unwatch",
            EventKind::WatchError => "watch-error",
            EventKind::Error => "error",
        };
        f.write_str(s)
    }
}

/// An event delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    All(ChangeEvent),
    File(ChangeEvent),
    Dir(ChangeEvent),
    Remove(ChangeEvent),
    /// A root finished its walk and is fully watched.
    Watch(PathBuf),
    /// A root's own watch was torn down.
    Unwatch(PathBuf),
    /// A root could not be watched at all.
    WatchError(DirError),
    /// A live watch failed at runtime.
    Error(DirError),
}

impl WatchEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            WatchEvent::All(_) => EventKind::All,
            WatchEvent::File(_) => EventKind::File,
            WatchEvent::Dir(_) => EventKind::Dir,
            WatchEvent::Remove(_) => EventKind::Remove,
            WatchEvent::Watch(_) => EventKind::Watch,
            WatchEvent::Unwatch(_) => EventKind::Unwatch,
            WatchEvent::WatchError(_) => EventKind::WatchError,
            WatchEvent::Error(_) => EventKind::Error,
        }
    }

    /// The change payload, for `all`/`file`/`dir`/`remove`.
    pub fn change(&self) -> Option<&ChangeEvent> {
        match self {
            WatchEvent::All(e)
            | WatchEvent::File(e)
            | WatchEvent::Dir(e)
            | WatchEvent::Remove(e) => {
                Some(e)
            }
            _ => None,
        }
    }

    /// The path this event is about.
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::All(e)
            | WatchEvent::File(e)
            | WatchEvent::Dir(e)
            | WatchEvent::Remove(e) => {
                &e.path
            }
            WatchEvent::Watch(p) | WatchEvent::Unwatch(p) => p,
            WatchEvent::WatchError(err) | WatchEvent::Error(err) => &err.dir,
        }
    }

    /// Wrap a change into its specific (non-`all`) event.
    pub(crate) fn specific(change: ChangeEvent) -> Self {
        match change.specific_kind() {
            EventKind::Remove => WatchEvent::Remove(change),
            EventKind::Dir => WatchEvent::Dir(change),
            _ => WatchEvent::File(change),
        }
    }
}

/// One-line rendering used by the CLI: `<event> [<raw kind>] <path>`.
impl fmt::Display for WatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WatchEvent::All(e)
            | WatchEvent::File(e)
            | WatchEvent::Dir(e)
            | WatchEvent::Remove(e) => {
                write!(f, "{} {} {}", self.kind(), e.kind, e.path.display())
            }
            WatchEvent::Watch(p) | WatchEvent::Unwatch(p) => {
                write!(f, "{} {}", self.kind(), p.display())
            }
            WatchEvent::WatchError(err) | WatchEvent::Error(err) => {
                write!(f, "{} {}", self.kind(), err)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn classification_maps_to_exactly_one_specific_kind() {
        let cases = [
            (Classification::File, EventKind::File),
            (Classification::Directory, EventKind::Dir),
            (Classification::NotFound, EventKind::Remove),
            (Classification::Failed(io::ErrorKind::PermissionDenied), EventKind::Remove),
        ];
        for (classification, expected) in cases {
            let ev =
                ChangeEvent::from_classification(ChangeKind::Structural, "/r/x", &classification);
            assert_eq!(ev.specific_kind(), expected, "{classification:?}");
            let flags = [ev.is_file, ev.is_directory, ev.removed];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1);
        }
    }

    #[test]
    fn display_is_one_line_per_event() {
        let file = Classification::File;
        let ev = ChangeEvent::from_classification(ChangeKind::Content, "/r/a.txt", &file);
        assert_eq!(WatchEvent::specific(ev).to_string(), "file change /r/a.txt");
        assert_eq!(WatchEvent::Unwatch(PathBuf::from("/r")).to_string(), "unwatch /r");
        let err = DirError::new("/r", io::ErrorKind::NotFound, "gone");
        assert_eq!(WatchEvent::WatchError(err).to_string(), "watch-error gone (dir: /r)");
    }

    #[test]
    fn removed_directory_relabel_keeps_removed() {
        let gone = Classification::NotFound;
        let ev = ChangeEvent::from_classification(ChangeKind::Structural, "/r/a", &gone)
            .as_removed_directory();
        assert!(ev.removed);
        assert!(ev.is_directory);
        assert!(!ev.is_file);
        assert_eq!(WatchEvent::specific(ev).kind(), EventKind::Remove);
    }
}
