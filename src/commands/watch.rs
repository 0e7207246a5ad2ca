//! Watch command - run the transition scheduler until interrupted.
//!
//! Every snapshot the scheduler publishes is logged when it changes the state
//! or escalates the urgency, the Hijri date change is announced after Maghrib,
//! and the day's prayer times are listed whenever notifications would be
//! rescheduled.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

use super::{format_duration, load_provider};
use crate::common::error::SchedulerError;
use crate::common::logger::Log;
use crate::core::PrayerName;
use crate::core::period::{PeriodState, PrayerPeriod};
use crate::core::prayer::DailyPrayerTimes;
use crate::core::urgency::UrgencyLevel;
use crate::scheduler::{NotificationRescheduler, PeriodObserver, TransitionScheduler};

/// Handle the watch command.
///
/// # Arguments
/// * `log_file` - Optional path receiving a plain-text copy of the log
pub async fn handle_watch_command(log_file: Option<String>) -> Result<()> {
    let _log_guard = match log_file {
        Some(path) => Some(Log::start_file_logging(path).context("Failed to start file logging")?),
        None => None,
    };
    Log::set_timestamps(true);

    log_version!();
    let (config, config_path, provider) = load_provider()?;
    config.log_config(&config_path);

    let settings = config.scheduler_settings()?;
    let observer = Arc::new(WatchObserver::new(settings.timezone, config.urgent_threshold()));
    let scheduler = TransitionScheduler::builder(Arc::new(provider), observer)
        .settings(settings.clone())
        .notifier(Arc::new(TimesAnnouncer {
            timezone: settings.timezone,
        }))
        .build();

    scheduler
        .start()
        .await
        .context("Failed to start the prayer period scheduler")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;

    log_block_start!("Interrupt received, shutting down");
    scheduler.stop();
    log_end!();
    Ok(())
}

/// Observer that logs meaningful changes only.
pub struct WatchObserver {
    timezone: Tz,
    urgent_threshold: chrono::Duration,
    last: Mutex<Option<(PeriodState, UrgencyLevel)>>,
}

impl WatchObserver {
    pub fn new(timezone: Tz, urgent_threshold: chrono::Duration) -> Self {
        Self {
            timezone,
            urgent_threshold,
            last: Mutex::new(None),
        }
    }

    /// Record `period` and report whether it is worth logging.
    fn is_news(&self, period: &PrayerPeriod) -> bool {
        let urgency = period.urgency(period.calculated_at);
        let mut last = self.last.lock().unwrap_or_else(|e| e.into_inner());
        let news = match *last {
            Some((state, previous)) => state != period.state || urgency > previous,
            None => true,
        };
        *last = Some((period.state, urgency));
        news
    }
}

impl PeriodObserver for WatchObserver {
    fn on_period_updated(&self, period: &PrayerPeriod) {
        if !self.is_news(period) {
            log_debug!("Recalculated: {}", period.state);
            return;
        }

        let remaining = period.time_remaining().num_seconds().max(0) as u64;
        let boundary = period.state.boundary().with_timezone(&self.timezone);
        log_block_start!(
            "{} {} | {} left (until {})",
            period.state.symbol(),
            period.state.display_name(),
            format_duration(remaining),
            boundary.format("%H:%M")
        );
        if period.is_urgent_with(self.urgent_threshold) {
            log_indented!("Urgency: {}", period.urgency(period.calculated_at));
        }
    }

    fn on_hijri_date_changed(&self, sunset_of: NaiveDate) {
        log_info!("Islamic day following {} has begun", sunset_of);
    }

    fn on_error(&self, error: &SchedulerError) {
        if error.is_fatal() {
            log_error!("Timetable problem: {error}");
            log_indented!("Fix the timetable file; the scheduler keeps the last valid times");
        }
    }
}

/// Stand-in notification rescheduler: lists the day's times.
struct TimesAnnouncer {
    timezone: Tz,
}

impl NotificationRescheduler for TimesAnnouncer {
    fn reschedule_notifications(&self, times: &DailyPrayerTimes) -> Result<()> {
        log_block_start!("Prayer times for {}", times.date);
        for prayer in PrayerName::ALL {
            log_indented!(
                "{:<8} {}",
                prayer.display_name(),
                times.time_of(prayer).with_timezone(&self.timezone).format("%H:%M")
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prayer::fixtures::{at, sample_day};

    fn june1() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[test]
    fn test_watch_observer_reports_state_changes_and_escalation() {
        let observer = WatchObserver::new(chrono_tz::UTC, chrono::Duration::minutes(30));
        let snapshot = |h, m| PrayerPeriod::calculate(at(june1(), h, m), sample_day(june1()), None);

        assert!(observer.is_news(&snapshot(13, 0)));
        // Same window, same urgency
        assert!(!observer.is_news(&snapshot(13, 5)));
        // Asr opens at 15:45; 15:20 is 25 minutes before, Elevated
        assert!(observer.is_news(&snapshot(15, 20)));
        assert!(!observer.is_news(&snapshot(15, 25)));
        assert!(observer.is_news(&snapshot(15, 45)));
    }
}
