use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// A temporary directory tree on the real filesystem.
///
/// The root is canonicalized, so event paths reported by the OS (which may
/// resolve symlinks such as `/tmp` -> `/private/tmp`) compare equal.
pub struct TempTree {
    _dir: TempDir,
    root: PathBuf,
}

impl TempTree {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let root = dir.path().canonicalize().expect("canonicalize temp dir");
        Self { _dir: dir, root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Create `rel` (and parents) as a directory.
    pub fn dir(self, rel: &str) -> Self {
        std::fs::create_dir_all(self.path(rel)).expect("create dir");
        self
    }

    /// Create `rel` as a file, creating parent directories.
    pub fn file(self, rel: &str, contents: &str) -> Self {
        let path = self.path(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, contents).expect("write file");
        self
    }
}

impl Default for TempTree {
    fn default() -> Self {
        Self::new()
    }
}
