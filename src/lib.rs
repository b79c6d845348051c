// src/lib.rs

//! Recursive directory watching.
//!
//! A [`Watcher`] keeps one native, non-recursive watch per directory under
//! each requested root, grows and shrinks that set as directories come and
//! go, and reports normalized [`WatchEvent`]s to subscribers.
//!
//! ```no_run
//! # async fn demo() -> treewatch::errors::Result<()> {
//! use treewatch::{WatchEvent, WatcherOptions};
//!
//! let watcher = treewatch::watch(["./src"], WatcherOptions::default()).await?;
//! let mut events = watcher.subscribe();
//! while let Some(event) = events.recv().await {
//!     if let WatchEvent::File(change) = event {
//!         println!("{} changed", change.path.display());
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod fs;
pub mod logging;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};

use anyhow::{Context, anyhow};
use tracing::{error, info};

use crate::cli::CliArgs;
use crate::config::{ConfigFile, default_config_path, load_and_validate, parse_duration};

pub use crate::config::WatcherOptions;
pub use crate::errors::{DirError, Result, TreewatchError};
pub use crate::types::{ChangeEvent, ChangeKind, EventKind, WatchEvent};
pub use crate::watch::{Ready, Watcher, WatcherBuilder};

/// Create a watcher, watch `paths` and wait until every root is watched.
///
/// Fails with the first root that could not be watched; the watcher is
/// closed in that case.
pub async fn watch<I, P>(paths: I, options: WatcherOptions) -> Result<Watcher>
where
    I: IntoIterator<Item = P>,
    P: AsRef<Path>,
{
    let watcher = Watcher::create(options)?;
    if let Err(err) = watcher.watch(paths).await {
        watcher.close().await?;
        return Err(err);
    }
    Ok(watcher)
}

/// High-level entry point used by `main.rs`.
///
/// Watches the requested roots, prints one line per event on STDOUT and
/// closes the watcher on Ctrl-C.
pub async fn run(args: CliArgs) -> anyhow::Result<()> {
    let (file, options) = resolve_options(&args)?;
    let paths = resolve_paths(&args, &file);
    info!(?paths, ?options, "starting treewatch");

    let watcher = Watcher::create(options)?;
    let mut events = watcher.subscribe_to(&[
        EventKind::File,
        EventKind::Dir,
        EventKind::Remove,
        EventKind::Watch,
        EventKind::Unwatch,
        EventKind::WatchError,
        EventKind::Error,
    ]);
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{event}");
        }
    });

    if let Err(err) = watcher.watch(&paths).await {
        error!(%err, "not every root could be watched");
    }
    if watcher.roots().await?.is_empty() {
        watcher.close().await?;
        let _ = printer.await;
        return Err(anyhow!("none of the requested paths could be watched"));
    }

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("shutting down");
    watcher.close().await?;
    let _ = printer.await;
    Ok(())
}

/// Config file first, then command-line overrides.
///
/// Without `--config`, `Treewatch.toml` in the working directory is used if
/// present.
fn resolve_options(args: &CliArgs) -> anyhow::Result<(ConfigFile, WatcherOptions)> {
    let config_path = args
        .config
        .clone()
        .or_else(|| Some(default_config_path()).filter(|p| p.is_file()));
    let (file, mut options) = match &config_path {
        Some(path) => load_and_validate(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => (ConfigFile::default(), WatcherOptions::default()),
    };

    if let Some(raw) = &args.rewatch_interval {
        let interval =
            parse_duration(raw).map_err(|e| anyhow!("invalid --rewatch-interval: {e}"))?;
        options = options.rewatch_interval(interval);
    }
    if args.show_hidden {
        options.ignore_hidden = false;
    }
    options.exclude.extend(args.exclude.iter().cloned());

    Ok((file, options))
}

fn resolve_paths(args: &CliArgs, file: &ConfigFile) -> Vec<PathBuf> {
    if !args.paths.is_empty() {
        args.paths.clone()
    } else if !file.paths.is_empty() {
        file.paths.clone()
    } else {
        vec![PathBuf::from(".")]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::time::Duration;

    #[test]
    fn cli_overrides_config_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let cfg = tmp.path().join("Treewatch.toml");
        std::fs::write(
            &cfg,
            "paths = [\"a\"]\nrewatch_interval = \"2s\"\nexclude = [\"build\"]\n",
        )
        .unwrap();

        let args = CliArgs::try_parse_from([
            "treewatch",
            "--config",
            cfg.to_str().unwrap(),
            "--rewatch-interval",
            "250ms",
            "--show-hidden",
            "--exclude",
            "dist",
        ])
        .unwrap();

        let (file, options) = resolve_options(&args).unwrap();
        assert_eq!(options.rewatch_interval, Some(Duration::from_millis(250)));
        assert!(!options.ignore_hidden);
        assert_eq!(options.exclude, vec!["build", "dist"]);
        assert_eq!(resolve_paths(&args, &file), vec![PathBuf::from("a")]);
    }

    #[test]
    fn paths_default_to_current_dir() {
        let args = CliArgs::try_parse_from(["treewatch"]).unwrap();
        assert_eq!(
            resolve_paths(&args, &ConfigFile::default()),
            vec![PathBuf::from(".")]
        );
    }
}
