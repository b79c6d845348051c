// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `treewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "treewatch",
    version,
    about = "Recursively watch directory trees and print normalized change events.",
    long_about = None
)]
pub struct CliArgs {
    /// Directories to watch. Falls back to `paths` from the config file,
    /// then to the current directory.
    #[arg(value_name = "PATHS")]
    pub paths: Vec<PathBuf>,

    /// Path to a config file (TOML). Defaults to `Treewatch.toml` in the
    /// working directory, if there is one.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Re-check vanished roots at this period, e.g. `500ms`, `2s`.
    #[arg(long, value_name = "DURATION")]
    pub rewatch_interval: Option<String>,

    /// Also report entries whose name starts with `.`.
    #[arg(long)]
    pub show_hidden: bool,

    /// Glob (relative to each root) to ignore. Repeatable.
    #[arg(long, value_name = "GLOB")]
    pub exclude: Vec<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `TREEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flags_and_paths() {
        let args = CliArgs::try_parse_from([
            "treewatch",
            "src",
            "assets",
            "--rewatch-interval",
            "500ms",
            "--show-hidden",
            "--exclude",
            "target/**",
            "--exclude",
            "node_modules",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(args.paths, vec![PathBuf::from("src"), PathBuf::from("assets")]);
        assert_eq!(args.rewatch_interval.as_deref(), Some("500ms"));
        assert!(args.show_hidden);
        assert_eq!(args.exclude, vec!["target/**", "node_modules"]);
        assert!(matches!(args.log_level, Some(LogLevel::Debug)));
        assert!(args.config.is_none());
    }
}
