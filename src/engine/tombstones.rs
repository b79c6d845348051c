// src/engine/tombstones.rs

//! Directories recently retracted because they were removed.
//!
//! A removed directory is usually reported twice: once by its own watch and
//! once by its parent's. The second report must not produce another `remove`.
//! Only the most recent removals are remembered; the oldest are forgotten
//! once the cap is reached.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};

pub const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug)]
pub struct Tombstones {
    /// Path -> sequence number of its latest insertion.
    live: HashMap<PathBuf, u64>,
    /// Insertion order. May hold superseded entries for re-inserted paths.
    order: VecDeque<(PathBuf, u64)>,
    next_seq: u64,
    capacity: usize,
}

impl Default for Tombstones {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl Tombstones {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            live: HashMap::new(),
            order: VecDeque::new(),
            next_seq: 0,
            capacity: capacity.max(1),
        }
    }

    pub fn insert(&mut self, path: PathBuf) {
        self.next_seq += 1;
        self.live.insert(path.clone(), self.next_seq);
        self.order.push_back((path, self.next_seq));
        self.evict();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.live.contains_key(path)
    }

    pub fn remove(&mut self, path: &Path) -> bool {
        self.live.remove(path).is_some()
    }

    pub fn clear(&mut self) {
        self.live.clear();
        self.order.clear();
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    fn evict(&mut self) {
        // Stale queue entries are dropped as they surface, so the queue stays
        // within a constant factor of the cap.
        while self.live.len() > self.capacity || self.order.len() > 2 * self.capacity {
            let Some((path, seq)) = self.order.pop_front() else {
                break;
            };
            if self.live.get(&path) == Some(&seq) {
                self.live.remove(&path);
            }
        }
    }
}

impl Extend<PathBuf> for Tombstones {
    fn extend<I: IntoIterator<Item = PathBuf>>(&mut self, iter: I) {
        for path in iter {
            self.insert(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_removal_is_forgotten_past_the_cap() {
        let mut tombstones = Tombstones::with_capacity(2);
        tombstones.extend(["/a", "/b", "/c"].map(PathBuf::from));

        assert_eq!(tombstones.len(), 2);
        assert!(!tombstones.contains(Path::new("/a")));
        assert!(tombstones.contains(Path::new("/b")));
        assert!(tombstones.contains(Path::new("/c")));
    }

    #[test]
    fn reinsert_refreshes_a_path() {
        let mut tombstones = Tombstones::with_capacity(2);
        tombstones.insert("/a".into());
        tombstones.insert("/b".into());
        tombstones.insert("/a".into());
        tombstones.insert("/c".into());

        assert!(tombstones.contains(Path::new("/a")));
        assert!(!tombstones.contains(Path::new("/b")));
        assert!(tombstones.contains(Path::new("/c")));
    }

    #[test]
    fn churn_on_one_path_stays_bounded() {
        let mut tombstones = Tombstones::with_capacity(4);
        for _ in 0..1000 {
            tombstones.insert("/same".into());
            assert!(tombstones.remove(Path::new("/same")));
        }
        assert!(tombstones.is_empty());
        assert!(tombstones.order.len() <= 8);
    }
}
