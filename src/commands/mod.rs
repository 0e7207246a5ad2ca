//! Command-line command handlers for salatr.
//!
//! Each command lives in its own submodule. Both commands build the same
//! timetable-backed provider from the loaded configuration.

pub mod status;
pub mod watch;

use anyhow::Result;
use std::path::PathBuf;

use crate::config::Config;
use crate::provider::TimetableProvider;

/// Load the configuration and the provider it points at.
pub(crate) fn load_provider() -> Result<(Config, PathBuf, TimetableProvider)> {
    let config_path = Config::get_config_path()?;
    let config = Config::load()?;
    let provider = TimetableProvider::new(config.timetable_path(&config_path), config.timezone()?);
    Ok((config, config_path, provider))
}

/// Format time duration consistently across all displays.
pub(crate) fn format_duration(total_seconds: u64) -> String {
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        if minutes > 0 {
            format!("{hours}h{minutes}m")
        } else {
            format!("{hours}h")
        }
    } else if minutes > 0 {
        format!("{minutes}m")
    } else {
        format!("{seconds}s")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0s");
        assert_eq!(format_duration(45), "45s");
        assert_eq!(format_duration(29 * 60 + 59), "29m");
        assert_eq!(format_duration(3600), "1h");
        assert_eq!(format_duration(2 * 3600 + 5 * 60), "2h5m");
    }
}
