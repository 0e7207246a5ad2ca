//! Status command - derive and display the current prayer period once.
//!
//! Reads today's and tomorrow's times from the configured timetable, derives
//! the period for now, and prints it human-readable or as JSON.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use super::{format_duration, load_provider};
use crate::common::constants::TIMETABLE_LOW_COVERAGE_DAYS;
use crate::common::logger::Log;
use crate::core::period::PrayerPeriod;
use crate::core::urgency::UrgencyLevel;
use crate::provider::timetable::days_remaining;
use crate::scheduler::PrayerTimeProvider;
use crate::time::source::{RealTimeSource, TimeSource};

/// JSON document printed by `status --json`.
#[derive(Debug, Serialize)]
pub struct StatusReport<'a> {
    #[serde(flatten)]
    pub period: &'a PrayerPeriod,
    pub label: String,
    pub urgency: UrgencyLevel,
    pub urgent: bool,
    pub seconds_remaining: i64,
    pub progress: f64,
}

impl<'a> StatusReport<'a> {
    pub fn new(period: &'a PrayerPeriod, urgent_threshold: chrono::Duration) -> Self {
        Self {
            period,
            label: period.state.display_name(),
            urgency: period.urgency(period.calculated_at),
            urgent: period.is_urgent_with(urgent_threshold),
            seconds_remaining: period.time_remaining().num_seconds(),
            progress: period.period_progress(),
        }
    }
}

/// Handle the status command.
///
/// # Arguments
/// * `json` - Output in JSON format
pub async fn handle_status_command(json: bool) -> Result<()> {
    if json {
        Log::set_enabled(false);
    }

    let (config, _, provider) = load_provider()?;
    let tz = config.timezone()?;
    let period = current_period(&provider, RealTimeSource.now(), tz).await?;
    let report = StatusReport::new(&period, config.urgent_threshold());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        let coverage = tokio::fs::read_to_string(provider.path())
            .await
            .ok()
            .map(|content| days_remaining(&content, period.today.date));
        display_human_readable(&report, tz, coverage);
    }
    Ok(())
}

/// Fetch both days and derive the period at `now`.
///
/// A missing or inconsistent tomorrow is tolerated; derivation then falls back
/// to the estimated next Fajr.
pub async fn current_period(
    provider: &dyn PrayerTimeProvider,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<PrayerPeriod> {
    let date = now.with_timezone(&tz).date_naive();
    let today = provider
        .fetch_today(date)
        .await
        .with_context(|| format!("Failed to load prayer times for {date}"))?;
    today
        .validate()
        .with_context(|| format!("Invalid prayer times for {date}"))?;

    let tomorrow = match provider.fetch_tomorrow(date).await {
        Ok(tomorrow) => match today.validate_against_next(&tomorrow).and(tomorrow.validate()) {
            Ok(()) => Some(tomorrow),
            Err(e) => {
                log_warning!("Ignoring tomorrow's prayer times: {e}");
                None
            }
        },
        Err(e) => {
            log_warning!("{e}");
            None
        }
    };

    Ok(PrayerPeriod::calculate(now, today, tomorrow))
}

fn display_human_readable(report: &StatusReport<'_>, tz: Tz, coverage: Option<i64>) {
    let period = report.period;
    let local = |instant: DateTime<Utc>| instant.with_timezone(&tz).format("%H:%M").to_string();

    log_version!();
    log_block_start!("{} {}", period.state.symbol(), report.label);
    let remaining = report.seconds_remaining.max(0) as u64;
    log_indented!(
        "Next boundary: {} (in {})",
        local(period.state.boundary()),
        format_duration(remaining)
    );
    log_indented!("Urgency: {}", report.urgency);
    log_indented!("Upcoming: {}", period.state.upcoming_prayer().display_name());
    if period.state.is_in_window() {
        log_indented!("Window elapsed: {:.0}%", report.progress * 100.0);
    }

    log_block_start!("Prayer times for {}", period.today.date);
    for prayer in crate::core::PrayerName::ALL {
        log_indented!(
            "{:<8} {}",
            prayer.display_name(),
            local(period.today.time_of(prayer))
        );
    }
    if let Some(midnight) = period.today.midnight {
        log_indented!("{:<8} {}", "Midnight", local(midnight));
    }
    match &period.tomorrow {
        Some(tomorrow) => log_indented!("Tomorrow's Fajr: {}", local(tomorrow.fajr)),
        None => log_indented!("Tomorrow's times unavailable"),
    }
    match coverage {
        Some(days) if days < TIMETABLE_LOW_COVERAGE_DAYS => {
            log_pipe!();
            log_warning!("Timetable runs out in {days} day(s), extend it soon");
        }
        Some(days) => log_indented!("Timetable covers {days} more day(s)"),
        None => {}
    }
    log_end!();
}

/// Display help for the status command.
pub fn display_help() {
    log_version!();
    log_block_start!("status - Display the current prayer period");
    log_block_start!("Usage: salatr status [--json]");
    log_block_start!("Options:");
    log_indented!("--json     Output the snapshot as JSON");
    log_end!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::error::ProviderError;
    use crate::core::PeriodState;
    use crate::core::prayer::DailyPrayerTimes;
    use crate::core::prayer::fixtures::{at, sample_day};
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct TodayOnly;

    #[async_trait]
    impl PrayerTimeProvider for TodayOnly {
        async fn fetch_day(&self, date: NaiveDate) -> Result<DailyPrayerTimes, ProviderError> {
            if date == june1() {
                Ok(sample_day(date))
            } else {
                Err(ProviderError::Unavailable {
                    date,
                    reason: "not published yet".into(),
                })
            }
        }
    }

    fn june1() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[tokio::test]
    async fn test_current_period_tolerates_missing_tomorrow() {
        let period = current_period(&TodayOnly, at(june1(), 16, 0), chrono_tz::UTC)
            .await
            .unwrap();

        assert!(period.tomorrow.is_none());
        assert_eq!(period.state.current_prayer(), Some(crate::core::PrayerName::Asr));
    }

    #[tokio::test]
    async fn test_current_period_fails_without_today() {
        let next_day = june1().succ_opt().unwrap();
        let result = current_period(&TodayOnly, at(next_day, 9, 0), chrono_tz::UTC).await;
        assert!(result.is_err());
    }

    #[test]
    fn test_status_report_json_shape() {
        let today = sample_day(june1());
        let period = PrayerPeriod::calculate(at(june1(), 18, 0), today, None);
        let report = StatusReport::new(&period, chrono::Duration::minutes(30));

        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["state"]["kind"], "in_progress");
        assert_eq!(json["state"]["prayer"], "asr");
        assert_eq!(json["seconds_remaining"], 20 * 60);
        assert_eq!(json["urgent"], true);
        assert!(matches!(period.state, PeriodState::InProgress { .. }));
    }
}
