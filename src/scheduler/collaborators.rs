//! Interfaces the scheduler consumes and feeds.
//!
//! The scheduler never computes prayer times or delivers notifications itself;
//! it talks to these collaborators through trait objects injected at
//! construction.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::common::error::{ProviderError, SchedulerError};
use crate::core::period::PrayerPeriod;
use crate::core::prayer::DailyPrayerTimes;

/// Source of a day's prayer timestamps.
#[async_trait]
pub trait PrayerTimeProvider: Send + Sync {
    /// Fetch the prayer times for a calendar day.
    async fn fetch_day(&self, date: NaiveDate) -> Result<DailyPrayerTimes, ProviderError>;

    /// Fetch the times for `today`.
    async fn fetch_today(&self, today: NaiveDate) -> Result<DailyPrayerTimes, ProviderError> {
        self.fetch_day(today).await
    }

    /// Fetch the times for the day after `today`.
    async fn fetch_tomorrow(&self, today: NaiveDate) -> Result<DailyPrayerTimes, ProviderError> {
        match today.succ_opt() {
            Some(tomorrow) => self.fetch_day(tomorrow).await,
            None => Err(ProviderError::Unavailable {
                date: today,
                reason: "no calendar day follows this date".to_string(),
            }),
        }
    }
}

/// Receives everything the scheduler publishes.
///
/// Callbacks run on the scheduler's tasks while its delivery gate is held, so
/// they should return quickly. Read-only accessors such as `today()` and
/// `current_period()` are safe to call from a callback; `stop()` and
/// `force_recalculate()` are not.
pub trait PeriodObserver: Send + Sync {
    /// A fresh snapshot was derived (tick, rollover, refresh, or manual trigger).
    fn on_period_updated(&self, period: &PrayerPeriod);

    /// Maghrib of `sunset_of` has passed; the Islamic calendar day advanced.
    fn on_hijri_date_changed(&self, _sunset_of: NaiveDate) {}

    /// A failure the scheduler recovered from or is retrying.
    /// `error.is_fatal()` marks a provider contract violation.
    fn on_error(&self, _error: &SchedulerError) {}
}

impl<F> PeriodObserver for F
where
    F: Fn(&PrayerPeriod) + Send + Sync,
{
    fn on_period_updated(&self, period: &PrayerPeriod) {
        self(period)
    }
}

/// Downstream notification scheduling. Best-effort: failures are logged and
/// reported, never allowed to affect period state.
pub trait NotificationRescheduler: Send + Sync {
    fn reschedule_notifications(&self, times: &DailyPrayerTimes) -> anyhow::Result<()>;
}
