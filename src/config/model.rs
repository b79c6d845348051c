// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

/// Configuration as read from a TOML file.
///
/// ```toml
/// paths = ["src", "assets"]
/// ignore_hidden = true
/// persistent = true
/// rewatch_interval = "500ms"
/// exclude = ["node_modules", "target/**"]
/// ```
///
/// Every key is optional. Durations are validated later, when the file is
/// turned into [`WatcherOptions`].
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Roots to watch when none are given on the command line.
    #[serde(default)]
    pub paths: Vec<PathBuf>,

    #[serde(default)]
    pub ignore_hidden: Option<bool>,

    #[serde(default)]
    pub persistent: Option<bool>,

    /// E.g. `"500ms"`, `"2s"`. `"0ms"` disables rewatching.
    #[serde(default)]
    pub rewatch_interval: Option<String>,

    /// Globs matched against paths relative to their root.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// Options a watcher is created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherOptions {
    /// Skip entries whose basename starts with `.`, both during traversal
    /// and when reporting changes.
    pub ignore_hidden: bool,
    /// Re-check vanished roots at this period. `None` disables rewatching.
    pub rewatch_interval: Option<Duration>,
    /// Keep the manager running after every handle is dropped, for as long
    /// as someone is still subscribed.
    pub persistent: bool,
    /// Exclude globs, relative to the owning root.
    pub exclude: Vec<String>,
}

impl Default for WatcherOptions {
    fn default() -> Self {
        Self {
            ignore_hidden: true,
            rewatch_interval: None,
            persistent: true,
            exclude: Vec::new(),
        }
    }
}

impl WatcherOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ignore_hidden(mut self, ignore: bool) -> Self {
        self.ignore_hidden = ignore;
        self
    }

    /// A zero interval means "disabled".
    pub fn rewatch_interval(mut self, interval: Duration) -> Self {
        self.rewatch_interval = (!interval.is_zero()).then_some(interval);
        self
    }

    pub fn persistent(mut self, persistent: bool) -> Self {
        self.persistent = persistent;
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude.push(pattern.into());
        self
    }
}
