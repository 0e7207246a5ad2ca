//! Prayer times read from a pre-computed TOML timetable.
//!
//! ```toml
//! [[day]]
//! date = "2026-06-01"
//! fajr = "05:30:00"
//! sunrise = "06:45:00"
//! dhuhr = "12:15:00"
//! asr = "15:45:00"
//! maghrib = "18:20:00"
//! isha = "19:45:00"
//! midnight = "00:00:00"   # optional, rolls into the next day
//! ```
//!
//! Times are local wall-clock times in the configured timezone. The night
//! markers (`midnight`, `first_third`, `last_third`) belong to the following
//! calendar day when their clock time is not after Isha.
//!
//! The file is re-read on every fetch, so edits take effect at the next
//! rollover or refresh without restarting.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::common::error::ProviderError;
use crate::core::prayer::DailyPrayerTimes;
use crate::scheduler::PrayerTimeProvider;
use crate::time::source::parse_datetime_in_tz;

#[derive(Debug, Deserialize)]
struct TimetableFile {
    #[serde(default, rename = "day")]
    days: Vec<DayEntry>,
}

#[derive(Debug, Deserialize)]
struct DayEntry {
    date: String,
    fajr: String,
    sunrise: String,
    dhuhr: String,
    asr: String,
    maghrib: String,
    isha: String,
    imsak: Option<String>,
    sunset: Option<String>,
    midnight: Option<String>,
    first_third: Option<String>,
    last_third: Option<String>,
}

/// A [`PrayerTimeProvider`] backed by a timetable file.
pub struct TimetableProvider {
    path: PathBuf,
    timezone: Tz,
}

impl TimetableProvider {
    pub fn new(path: impl Into<PathBuf>, timezone: Tz) -> Self {
        Self {
            path: path.into(),
            timezone,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PrayerTimeProvider for TimetableProvider {
    async fn fetch_day(&self, date: NaiveDate) -> Result<DailyPrayerTimes, ProviderError> {
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            ProviderError::Unavailable {
                date,
                reason: format!("cannot read {}: {e}", self.path.display()),
            }
        })?;

        parse_day(&content, date, self.timezone)
    }
}

/// Find and convert the entry for `date` in a timetable document.
pub fn parse_day(content: &str, date: NaiveDate, tz: Tz) -> Result<DailyPrayerTimes, ProviderError> {
    let malformed = |reason: String| ProviderError::Malformed { date, reason };

    let file: TimetableFile = toml::from_str(content).map_err(|e| malformed(e.to_string()))?;

    let mut found = None;
    for entry in file.days {
        let entry_date = NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d").map_err(|e| {
            malformed(format!("invalid date '{}': {e}. Use YYYY-MM-DD", entry.date))
        })?;
        if entry_date == date {
            found = Some(entry);
            break;
        }
    }

    let Some(entry) = found else {
        return Err(ProviderError::Unavailable {
            date,
            reason: "date not present in timetable".to_string(),
        });
    };

    let at = |field: &str, time: &str| -> Result<DateTime<Utc>, ProviderError> {
        parse_datetime_in_tz(&format!("{date} {time}"), tz)
            .map_err(|e| malformed(format!("{field}: {e}")))
    };
    let optional = |field: &str, time: &Option<String>| -> Result<Option<DateTime<Utc>>, ProviderError> {
        time.as_deref().map(|t| at(field, t)).transpose()
    };

    let isha = at("isha", &entry.isha)?;
    let night = |field: &str, time: &Option<String>| -> Result<Option<DateTime<Utc>>, ProviderError> {
        let Some(time) = time.as_deref() else {
            return Ok(None);
        };
        let same_day = at(field, time)?;
        if same_day > isha {
            return Ok(Some(same_day));
        }
        let next = date
            .succ_opt()
            .ok_or_else(|| malformed(format!("{field}: no calendar day follows {date}")))?;
        parse_datetime_in_tz(&format!("{next} {time}"), tz)
            .map(Some)
            .map_err(|e| malformed(format!("{field}: {e}")))
    };

    Ok(DailyPrayerTimes {
        date,
        fajr: at("fajr", &entry.fajr)?,
        sunrise: at("sunrise", &entry.sunrise)?,
        dhuhr: at("dhuhr", &entry.dhuhr)?,
        asr: at("asr", &entry.asr)?,
        maghrib: at("maghrib", &entry.maghrib)?,
        isha,
        imsak: optional("imsak", &entry.imsak)?,
        sunset: optional("sunset", &entry.sunset)?,
        midnight: night("midnight", &entry.midnight)?,
        first_third: night("first_third", &entry.first_third)?,
        last_third: night("last_third", &entry.last_third)?,
    })
}

/// First and last date covered by a timetable, for status output.
pub fn coverage(content: &str) -> Option<(NaiveDate, NaiveDate)> {
    let file: TimetableFile = toml::from_str(content).ok()?;
    let dates = file
        .days
        .iter()
        .filter_map(|entry| NaiveDate::parse_from_str(&entry.date, "%Y-%m-%d").ok());
    Some((dates.clone().min()?, dates.max()?))
}

/// Number of days the timetable still covers after `today`.
pub fn days_remaining(content: &str, today: NaiveDate) -> i64 {
    coverage(content).map_or(0, |(_, last)| (last - today).num_days().max(0))
}
