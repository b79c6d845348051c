// src/watch/path_utils.rs

//! Utility functions for path handling in the watcher.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// Returns `None` if `path` is not under `root`. An empty string means
/// `path == root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    Some(rel.to_string_lossy().replace('\\', "/"))
}

/// Make a caller-supplied path absolute without touching the filesystem
/// beyond reading the current directory. Symlinks are left alone so event
/// paths keep the prefix the caller used.
pub fn absolutize(path: &Path) -> PathBuf {
    std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
}

/// True when `name` starts with the hidden-entry marker (`.`).
pub fn is_hidden_name(name: &OsStr) -> bool {
    name.as_encoded_bytes().first() == Some(&b'.')
}

/// True when `path` equals `root` or lies beneath it (component-wise).
pub fn is_within(root: &Path, path: &Path) -> bool {
    path.starts_with(root)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_str_uses_forward_slashes() {
        let root = Path::new("/w/root");
        assert_eq!(
            relative_str(root, Path::new("/w/root/a/b.txt")).as_deref(),
            Some("a/b.txt")
        );
        assert_eq!(relative_str(root, root).as_deref(), Some(""));
        assert_eq!(relative_str(root, Path::new("/w/other")), None);
    }

    #[test]
    fn within_is_component_wise() {
        let root = Path::new("/w/sub");
        assert!(is_within(root, Path::new("/w/sub")));
        assert!(is_within(root, Path::new("/w/sub/x")));
        assert!(!is_within(root, Path::new("/w/sub2")));
    }

    #[test]
    fn hidden_marker() {
        assert!(is_hidden_name(OsStr::new(".tmp.swp")));
        assert!(!is_hidden_name(OsStr::new("tmp.swp")));
        assert!(!is_hidden_name(OsStr::new("")));
    }

    #[test]
    fn absolutize_keeps_absolute_paths() {
        assert_eq!(absolutize(Path::new("/a/b")), PathBuf::from("/a/b"));
        assert!(absolutize(Path::new("rel")).is_absolute());
    }
}
