// src/logging.rs

//! Logging for the `treewatch` binary (`tracing` + `tracing-subscriber`).
//!
//! The filter comes from, in order:
//! 1. `--log-level`, applied to every target;
//! 2. `TREEWATCH_LOG`, a full `EnvFilter` directive such as
//!    `"treewatch=debug,notify=warn"`;
//! 3. `info`.
//!
//! Logs go to STDERR. STDOUT carries nothing but event lines.

use anyhow::{Context, Result, anyhow};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "TREEWATCH_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV).ok().as_deref())?;

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install the log subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    if let Some(level) = cli_level {
        return Ok(EnvFilter::new(directive(level)));
    }
    match env.map(str::trim).filter(|s| !s.is_empty()) {
        Some(spec) => {
            EnvFilter::try_new(spec).with_context(|| format!("invalid {LOG_ENV} value '{spec}'"))
        }
        None => Ok(EnvFilter::new("info")),
    }
}

fn directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
