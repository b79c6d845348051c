// src/engine/rewatch.rs

//! Rewatch timers for roots that vanished.
//!
//! One recurring timer per waiting root. A tick only posts
//! `ManagerEvent::RewatchTick` back onto the manager queue; the manager
//! decides what to do with it, and ignores ticks whose generation is stale.
//! Cancelling aborts the timer task, so no tick is produced afterwards.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::debug;

use crate::engine::ManagerEvent;

#[derive(Debug)]
pub struct RewatchScheduler {
    interval: Option<Duration>,
    timers: HashMap<PathBuf, JoinHandle<()>>,
    tx: mpsc::UnboundedSender<ManagerEvent>,
}

impl RewatchScheduler {
    /// `interval` of `None` (or zero) disables rewatching entirely.
    pub fn new(interval: Option<Duration>, tx: mpsc::UnboundedSender<ManagerEvent>) -> Self {
        Self {
            interval: interval.filter(|d| !d.is_zero()),
            timers: HashMap::new(),
            tx,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.interval.is_some()
    }

    /// Arm (or re-arm) the recurring timer for `root`. First tick fires one
    /// interval from now. Returns false when rewatching is disabled.
    pub fn arm(&mut self, root: &Path, generation: u64) -> bool {
        let Some(period) = self.interval else {
            return false;
        };
        self.cancel(root);

        let tx = self.tx.clone();
        let path = root.to_path_buf();
        let task = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let tick = ManagerEvent::RewatchTick {
                    root: path.clone(),
                    generation,
                };
                if tx.send(tick).is_err() {
                    break;
                }
            }
        });

        debug!(root = ?root, ?period, "rewatch timer armed");
        self.timers.insert(root.to_path_buf(), task);
        true
    }

    pub fn cancel(&mut self, root: &Path) -> bool {
        match self.timers.remove(root) {
            Some(task) => {
                task.abort();
                debug!(root = ?root, "rewatch timer cancelled");
                true
            }
            None => false,
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, task) in self.timers.drain() {
            task.abort();
        }
    }

    #[cfg(test)]
    fn is_armed(&self, root: &Path) -> bool {
        self.timers.contains_key(root)
    }
}

impl Drop for RewatchScheduler {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
