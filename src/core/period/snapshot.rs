//! Immutable period snapshots handed to observers.
//!
//! A `PrayerPeriod` bundles the derived state with the data it was derived
//! from. Countdown, progress, and urgency are computed on demand so the
//! snapshot never goes stale internally; callers pass `now` to get live values
//! or use the `*_at_calculation` accessors for the values at derivation time.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::common::constants::DEFAULT_URGENT_THRESHOLD;
use crate::core::period::{PeriodState, derive, window_bounds, window_progress};
use crate::core::prayer::DailyPrayerTimes;
use crate::core::urgency::UrgencyLevel;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrayerPeriod {
    pub state: PeriodState,
    pub today: DailyPrayerTimes,
    pub tomorrow: Option<DailyPrayerTimes>,
    pub calculated_at: DateTime<Utc>,
}

impl PrayerPeriod {
    /// Derive a fresh snapshot for `now`.
    pub fn calculate(
        now: DateTime<Utc>,
        today: DailyPrayerTimes,
        tomorrow: Option<DailyPrayerTimes>,
    ) -> Self {
        let state = derive(now, &today, tomorrow.as_ref());
        Self::from_state(state, today, tomorrow, now)
    }

    /// Bundle an already derived state.
    pub fn from_state(
        state: PeriodState,
        today: DailyPrayerTimes,
        tomorrow: Option<DailyPrayerTimes>,
        calculated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            state,
            today,
            tomorrow,
            calculated_at,
        }
    }

    /// Time left until the state's boundary. Negative once it has passed.
    pub fn time_until_next_event(&self, now: DateTime<Utc>) -> Duration {
        self.state.boundary() - now
    }

    /// Time left until the boundary as seen at derivation time.
    pub fn time_remaining(&self) -> Duration {
        self.time_until_next_event(self.calculated_at)
    }

    /// Urgency of the countdown at `now`.
    pub fn urgency(&self, now: DateTime<Utc>) -> UrgencyLevel {
        UrgencyLevel::from_duration(self.time_until_next_event(now))
    }

    /// True when at most 30 minutes remain before the boundary.
    pub fn is_urgent(&self) -> bool {
        self.is_urgent_with(Duration::minutes(DEFAULT_URGENT_THRESHOLD as i64))
    }

    /// True when at most `threshold` remains before the boundary.
    pub fn is_urgent_with(&self, threshold: Duration) -> bool {
        self.time_remaining() <= threshold
    }

    /// Start of the current window, `None` outside in-window states.
    pub fn window_start(&self) -> Option<DateTime<Utc>> {
        window_bounds(&self.state, &self.today).map(|(start, _)| start)
    }

    /// Fraction of the current window elapsed at `now`, in `[0, 1]`.
    ///
    /// Returns 0 for `BeforeFajr` and `AfterIsha`, which have no window.
    pub fn progress_at(&self, now: DateTime<Utc>) -> f64 {
        window_bounds(&self.state, &self.today)
            .map(|(start, end)| window_progress(now, start, end))
            .unwrap_or(0.0)
    }

    /// Fraction of the current window elapsed at derivation time.
    pub fn period_progress(&self) -> f64 {
        self.progress_at(self.calculated_at)
    }

    /// True when `now` is no longer inside this snapshot's state.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.state.boundary()
    }
}
