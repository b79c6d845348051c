// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, WatcherOptions};
use crate::errors::{Result, TreewatchError};
use crate::watch::patterns::EntryFilter;

impl TryFrom<&ConfigFile> for WatcherOptions {
    type Error = TreewatchError;

    fn try_from(file: &ConfigFile) -> std::result::Result<Self, Self::Error> {
        let defaults = WatcherOptions::default();

        let rewatch_interval = match file.rewatch_interval.as_deref() {
            Some(raw) => {
                let interval = parse_duration(raw).map_err(|e| {
                    TreewatchError::ConfigError(format!("invalid rewatch_interval: {e}"))
                })?;
                (!interval.is_zero()).then_some(interval)
            }
            None => defaults.rewatch_interval,
        };

        let options = WatcherOptions {
            ignore_hidden: file.ignore_hidden.unwrap_or(defaults.ignore_hidden),
            rewatch_interval,
            persistent: file.persistent.unwrap_or(defaults.persistent),
            exclude: file.exclude.clone(),
        };
        validate_options(&options)?;
        Ok(options)
    }
}

/// Check options that can only be validated by building something from them.
pub fn validate_options(options: &WatcherOptions) -> Result<()> {
    EntryFilter::from_options(options)?;
    Ok(())
}

/// Parse a simple duration string like `"500ms"`, `"2s"`, `"1m"`, `"1h"`.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    // Find the boundary between digits and suffix.
    let idx = s
        .chars()
        .position(|c| !c.is_ascii_digit())
        .ok_or_else(|| format!("duration '{s}' is missing a unit suffix"))?;

    let (num_part, unit_part) = s.split_at(idx);
    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    let secs_per_unit = match unit.as_str() {
        "ms" => return Ok(Duration::from_millis(value)),
        "s" => 1,
        "m" => 60,
        "h" => 60 * 60,
        _ => {
            return Err(format!(
                "unsupported duration unit '{unit}'; expected ms, s, m, or h"
            ));
        }
    };
    value
        .checked_mul(secs_per_unit)
        .map(Duration::from_secs)
        .ok_or_else(|| format!("duration '{s}' out of range"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_supported_units() {
        assert_eq!(parse_duration("500ms"), Ok(Duration::from_millis(500)));
        assert_eq!(parse_duration(" 2s "), Ok(Duration::from_secs(2)));
        assert_eq!(parse_duration("3m"), Ok(Duration::from_secs(180)));
        assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));
        assert!(parse_duration("10").is_err());
        assert!(parse_duration("ms").is_err());
        assert!(parse_duration("5d").is_err());
    }

    #[test]
    fn oversized_durations_are_rejected() {
        let err = parse_duration("18446744073709551615h").unwrap_err();
        assert!(err.contains("out of range"), "{err}");
        assert!(parse_duration("307445734561825861m").is_err());
        assert_eq!(
            parse_duration("18446744073709551615ms"),
            Ok(Duration::from_millis(u64::MAX))
        );
    }

    #[test]
    fn empty_file_gives_defaults() {
        let options = WatcherOptions::try_from(&ConfigFile::default()).unwrap();
        assert_eq!(options, WatcherOptions::default());
    }

    #[test]
    fn zero_interval_disables_rewatch() {
        let file = ConfigFile {
            rewatch_interval: Some("0ms".to_string()),
            ..ConfigFile::default()
        };
        assert_eq!(WatcherOptions::try_from(&file).unwrap().rewatch_interval, None);
    }

    #[test]
    fn bad_values_are_config_errors() {
        let file = ConfigFile {
            rewatch_interval: Some("soon".to_string()),
            ..ConfigFile::default()
        };
        assert!(matches!(
            WatcherOptions::try_from(&file),
            Err(TreewatchError::ConfigError(msg)) if msg.contains("rewatch_interval")
        ));

        let file = ConfigFile {
            exclude: vec!["[".to_string()],
            ..ConfigFile::default()
        };
        assert!(matches!(
            WatcherOptions::try_from(&file),
            Err(TreewatchError::ConfigError(_))
        ));
    }
}
