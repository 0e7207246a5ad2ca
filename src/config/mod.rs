//! Configuration system for salatr.
//!
//! Settings live in `salatr.toml`, searched for in:
//! 1. The directory passed with `--config DIR`
//! 2. **XDG_CONFIG_HOME**/salatr/salatr.toml
//!
//! A missing file is not an error: every field falls back to the defaults in
//! `common::constants`.
//!
//! ```toml
//! timezone = "Europe/London"      # IANA zone delimiting calendar days (default UTC)
//! timetable = "timetable.toml"    # Prayer timetable, relative to this file
//! recalculation_interval = 300    # Periodic re-derivation in seconds (30-3600)
//! rollover_buffer = 5             # Seconds after local midnight before rolling over (0-300)
//! sunset_buffer = 2               # Seconds after Maghrib before the Hijri date advances (0-300)
//! urgent_threshold = 30           # Minutes left before a deadline counts as urgent (1-120)
//! ```

pub mod loading;
pub mod validation;

use anyhow::{Context, Result};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::common::constants::*;
use crate::scheduler::SchedulerSettings;

pub use loading::{get_config_path, get_custom_config_dir, load, load_from_path, set_config_dir};

/// Settings loaded from `salatr.toml`.
///
/// Every field is optional; accessors resolve missing values against the
/// defaults. Values are range-checked by [`validation::validate_config`]
/// when loaded.
#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
pub struct Config {
    /// IANA timezone whose calendar days delimit "today" and "tomorrow".
    pub timezone: Option<String>,

    /// Path to the prayer timetable. Relative paths resolve against the
    /// directory holding the config file.
    pub timetable: Option<String>,

    /// Periodic re-derivation cadence in seconds.
    pub recalculation_interval: Option<u64>,

    /// Delay after local midnight before the day rollover, in seconds.
    pub rollover_buffer: Option<u64>,

    /// Delay after Maghrib before signalling the Hijri date change, in seconds.
    pub sunset_buffer: Option<u64>,

    /// Remaining minutes at or below which a deadline is reported as urgent.
    pub urgent_threshold: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load()
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        load_from_path(path)
    }

    pub fn get_config_path() -> Result<PathBuf> {
        get_config_path()
    }

    /// The configured timezone.
    pub fn timezone(&self) -> Result<Tz> {
        let name = self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE);
        name.parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Unknown timezone '{name}': {e}"))
    }

    /// Resolve the timetable path against the directory of `config_path`.
    pub fn timetable_path(&self, config_path: &Path) -> PathBuf {
        let timetable = PathBuf::from(self.timetable.as_deref().unwrap_or(DEFAULT_TIMETABLE_FILE));
        if timetable.is_absolute() {
            return timetable;
        }
        config_path
            .parent()
            .map(|dir| dir.join(&timetable))
            .unwrap_or(timetable)
    }

    pub fn recalculation_interval(&self) -> Duration {
        Duration::from_secs(
            self.recalculation_interval
                .unwrap_or(DEFAULT_RECALCULATION_INTERVAL),
        )
    }

    pub fn rollover_buffer(&self) -> Duration {
        Duration::from_secs(self.rollover_buffer.unwrap_or(DEFAULT_ROLLOVER_BUFFER))
    }

    pub fn sunset_buffer(&self) -> Duration {
        Duration::from_secs(self.sunset_buffer.unwrap_or(DEFAULT_SUNSET_BUFFER))
    }

    pub fn urgent_threshold(&self) -> chrono::Duration {
        chrono::Duration::minutes(
            self.urgent_threshold.unwrap_or(DEFAULT_URGENT_THRESHOLD) as i64,
        )
    }

    /// Scheduler timing derived from this configuration.
    pub fn scheduler_settings(&self) -> Result<SchedulerSettings> {
        Ok(SchedulerSettings {
            timezone: self
                .timezone()
                .context("Failed to resolve the configured timezone")?,
            recalculation_interval: self.recalculation_interval(),
            rollover_buffer: self.rollover_buffer(),
            sunset_buffer: self.sunset_buffer(),
        })
    }

    /// Log the effective configuration.
    pub fn log_config(&self, config_path: &Path) {
        log_block_start!("Loaded configuration");
        log_indented!("Path: {}", config_path.display());
        log_indented!("Timezone: {}", self.timezone.as_deref().unwrap_or(DEFAULT_TIMEZONE));
        log_indented!("Timetable: {}", self.timetable_path(config_path).display());
        log_indented!(
            "Recalculation interval: {}s",
            self.recalculation_interval().as_secs()
        );
        log_indented!("Rollover buffer: {}s", self.rollover_buffer().as_secs());
        log_indented!("Sunset buffer: {}s", self.sunset_buffer().as_secs());
        log_indented!(
            "Urgent threshold: {} minutes",
            self.urgent_threshold().num_minutes()
        );
    }
}
