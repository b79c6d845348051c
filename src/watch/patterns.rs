// src/watch/patterns.rs

//! Entry filtering shared by traversal and event handling.
//!
//! Two independent rules decide whether an entry is invisible to the watcher:
//! - the hidden-entry marker (basename starting with `.`), when
//!   `ignore_hidden` is on;
//! - optional `exclude` globs, matched against the path relative to the
//!   owning root (e.g. `"node_modules"` or `"build/**"`).
//!
//! A rejected directory is pruned from walks, so nothing beneath it is
//! watched either.

use std::ffi::OsStr;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::WatcherOptions;
use crate::errors::{Result, TreewatchError};
use crate::watch::path_utils::{is_hidden_name, relative_str};

#[derive(Clone, Default)]
pub struct EntryFilter {
    ignore_hidden: bool,
    exclude: Option<Arc<GlobSet>>,
}

impl fmt::Debug for EntryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryFilter")
            .field("ignore_hidden", &self.ignore_hidden)
            .field("exclude_patterns", &self.exclude.as_ref().map_or(0, |s| s.len()))
            .finish()
    }
}

impl EntryFilter {
    pub fn new(ignore_hidden: bool, exclude: &[String]) -> Result<Self> {
        let exclude = if exclude.is_empty() {
            None
        } else {
            Some(Arc::new(build_globset(exclude)?))
        };
        Ok(Self {
            ignore_hidden,
            exclude,
        })
    }

    pub fn from_options(options: &WatcherOptions) -> Result<Self> {
        Self::new(options.ignore_hidden, &options.exclude)
    }

    /// Whether a bare entry name is dropped by the hidden rule.
    pub fn is_hidden_name(&self, name: &OsStr) -> bool {
        self.ignore_hidden && is_hidden_name(name)
    }

    /// Whether `path` (under `base`) matches an exclude glob.
    pub fn is_excluded(&self, base: &Path, path: &Path) -> bool {
        let Some(set) = &self.exclude else {
            return false;
        };
        match relative_str(base, path) {
            Some(rel) if !rel.is_empty() => set.is_match(&rel),
            _ => false,
        }
    }

    /// Combined rule used for directories found during a walk.
    ///
    /// `base` itself is never rejected: a root the caller asked for is
    /// watched even if its own name is hidden.
    pub fn rejects(&self, base: &Path, path: &Path) -> bool {
        if path == base {
            return false;
        }
        let hidden = path.file_name().is_some_and(|name| self.is_hidden_name(name));
        hidden || self.is_excluded(base, path)
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|e| {
            TreewatchError::ConfigError(format!("invalid exclude pattern '{pat}': {e}"))
        })?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
