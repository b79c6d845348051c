// src/engine/roots.rs

//! Root records: the paths a caller explicitly asked to watch.
//!
//! Only roots can be rewatched. Each record carries a generation number that
//! changes whenever the root starts a new life (created, torn down, re-armed),
//! so walks and timer ticks issued for an older life are recognised as stale.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootState {
    /// Initial or rewatch walk in flight.
    Walking,
    /// Walk finished; `watch` was emitted.
    Watched,
    /// Root vanished and a rewatch timer is armed.
    Waiting,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootRecord {
    pub path: PathBuf,
    pub generation: u64,
    pub state: RootState,
}

#[derive(Debug, Default)]
pub struct RootTable {
    records: HashMap<PathBuf, RootRecord>,
    next_generation: u64,
}

impl RootTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn bump(&mut self) -> u64 {
        self.next_generation += 1;
        self.next_generation
    }

    /// Create a record in `Walking` state. Returns its generation.
    pub fn insert(&mut self, path: PathBuf) -> u64 {
        let generation = self.bump();
        self.records.insert(
            path.clone(),
            RootRecord {
                path,
                generation,
                state: RootState::Walking,
            },
        );
        generation
    }

    /// Move an existing record to `state` under a fresh generation.
    pub fn transition(&mut self, path: &Path, state: RootState) -> Option<u64> {
        let generation = self.bump();
        let record = self.records.get_mut(path)?;
        record.state = state;
        record.generation = generation;
        Some(generation)
    }

    /// Change state without starting a new generation.
    pub fn set_state(&mut self, path: &Path, state: RootState) {
        if let Some(record) = self.records.get_mut(path) {
            record.state = state;
        }
    }

    pub fn get(&self, path: &Path) -> Option<&RootRecord> {
        self.records.get(path)
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.records.contains_key(path)
    }

    /// True if `path` is a root still living the given generation.
    pub fn is_current(&self, path: &Path, generation: u64) -> bool {
        self.records
            .get(path)
            .is_some_and(|r| r.generation == generation)
    }

    pub fn remove(&mut self, path: &Path) -> Option<RootRecord> {
        self.records.remove(path)
    }

    /// Roots equal to or beneath `path`, sorted.
    pub fn within(&self, path: &Path) -> Vec<PathBuf> {
        let mut found: Vec<PathBuf> = self
            .records
            .keys()
            .filter(|p| p.starts_with(path))
            .cloned()
            .collect();
        found.sort();
        found
    }

    /// The deepest root containing `path`, if any.
    pub fn owner_of(&self, path: &Path) -> Option<&Path> {
        self.records
            .keys()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<PathBuf> = self.records.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
