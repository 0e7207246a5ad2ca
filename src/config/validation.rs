//! Configuration validation functionality.
//!
//! Rejects out-of-range timing values and unknown timezones before the
//! scheduler sees them.

use anyhow::Result;

use super::Config;
use crate::common::constants::*;

/// Check every configured value against its allowed range.
pub fn validate_config(config: &Config) -> Result<()> {
    if let Some(name) = config.timezone.as_deref()
        && name.parse::<chrono_tz::Tz>().is_err()
    {
        anyhow::bail!("timezone '{}' is not a known IANA timezone name", name);
    }

    if let Some(timetable) = config.timetable.as_deref()
        && timetable.trim().is_empty()
    {
        anyhow::bail!("timetable path must not be empty");
    }

    if let Some(interval) = config.recalculation_interval
        && !(MINIMUM_RECALCULATION_INTERVAL..=MAXIMUM_RECALCULATION_INTERVAL).contains(&interval)
    {
        anyhow::bail!(
            "recalculation_interval ({} seconds) must be between {} and {} seconds",
            interval,
            MINIMUM_RECALCULATION_INTERVAL,
            MAXIMUM_RECALCULATION_INTERVAL
        );
    }

    validate_buffer(config.rollover_buffer, "rollover_buffer")?;
    validate_buffer(config.sunset_buffer, "sunset_buffer")?;

    if let Some(threshold) = config.urgent_threshold
        && !(MINIMUM_URGENT_THRESHOLD..=MAXIMUM_URGENT_THRESHOLD).contains(&threshold)
    {
        anyhow::bail!(
            "urgent_threshold ({} minutes) must be between {} and {} minutes",
            threshold,
            MINIMUM_URGENT_THRESHOLD,
            MAXIMUM_URGENT_THRESHOLD
        );
    }

    Ok(())
}

fn validate_buffer(buffer: Option<u64>, name: &str) -> Result<()> {
    if let Some(secs) = buffer
        && secs > MAXIMUM_BOUNDARY_BUFFER
    {
        anyhow::bail!(
            "{} ({} seconds) must not exceed {} seconds",
            name,
            secs,
            MAXIMUM_BOUNDARY_BUFFER
        );
    }
    Ok(())
}
