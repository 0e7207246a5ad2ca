//! Period derivation for a day's prayer timeline.
//!
//! This module maps an instant onto exactly one [`PeriodState`] given today's
//! and (optionally) tomorrow's prayer times. All windows are half-open
//! `[start, end)`, so a read taken exactly at a boundary already belongs to the
//! following state.
//!
//! ## Key Functionality
//! - **Period Detection**: `try_derive` / `derive` choose the active state
//! - **Window Bounds**: `window_bounds` recovers the window a state covers
//! - **Progress**: `window_progress` computes elapsed fraction of a window
//! - **Change Detection**: `state_detection` classifies consecutive states
//!
//! The day visits its states in a fixed order:
//! `BeforeFajr → Fajr → (dead zone) → Dhuhr → Asr → Maghrib → Isha → AfterIsha`.
//! Only the stretch between sunrise and Dhuhr is a dead zone; every other
//! window closes exactly when the next one opens.

pub mod snapshot;
pub mod state_detection;

pub use snapshot::PrayerPeriod;
pub use state_detection::{StateChange, detect_state_change, log_state_announcement, should_update_state};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::error::PeriodError;
use crate::core::prayer::{DailyPrayerTimes, PrayerName};

/// The liturgical period the current instant falls in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeriodState {
    /// Before today's Fajr.
    BeforeFajr { next_fajr: DateTime<Utc> },

    /// Inside a prayer's valid window, which closes at `deadline`.
    InProgress {
        prayer: PrayerName,
        deadline: DateTime<Utc>,
    },

    /// No window open. Only occurs between sunrise and Dhuhr.
    BetweenPrayers {
        previous: PrayerName,
        next: PrayerName,
        next_start: DateTime<Utc>,
    },

    /// After Islamic midnight, before tomorrow's Fajr.
    AfterIsha { tomorrow_fajr: DateTime<Utc> },
}

impl PeriodState {
    /// The instant at which this state ends.
    pub fn boundary(&self) -> DateTime<Utc> {
        match *self {
            PeriodState::BeforeFajr { next_fajr } => next_fajr,
            PeriodState::InProgress { deadline, .. } => deadline,
            PeriodState::BetweenPrayers { next_start, .. } => next_start,
            PeriodState::AfterIsha { tomorrow_fajr } => tomorrow_fajr,
        }
    }

    /// The prayer whose window is open, if any.
    pub fn current_prayer(&self) -> Option<PrayerName> {
        match *self {
            PeriodState::InProgress { prayer, .. } => Some(prayer),
            _ => None,
        }
    }

    /// The prayer whose window opens next.
    pub fn upcoming_prayer(&self) -> PrayerName {
        match *self {
            PeriodState::BeforeFajr { .. } | PeriodState::AfterIsha { .. } => PrayerName::Fajr,
            PeriodState::InProgress { prayer, .. } => prayer.next().unwrap_or(PrayerName::Fajr),
            PeriodState::BetweenPrayers { next, .. } => next,
        }
    }

    /// Returns true while a prayer's window is open.
    pub fn is_in_window(&self) -> bool {
        matches!(self, PeriodState::InProgress { .. })
    }

    /// Returns the display name for this state (without icon).
    pub fn display_name(&self) -> String {
        match self {
            PeriodState::BeforeFajr { .. } => "Before Fajr".to_string(),
            PeriodState::InProgress { prayer, .. } => prayer.display_name().to_string(),
            PeriodState::BetweenPrayers { previous, next, .. } => {
                format!("Between {previous} and {next}")
            }
            PeriodState::AfterIsha { .. } => "After Isha".to_string(),
        }
    }

    /// Returns the icon/symbol for this state.
    pub fn symbol(&self) -> &'static str {
        match self {
            PeriodState::BeforeFajr { .. } | PeriodState::AfterIsha { .. } => "󰖔 ",
            PeriodState::InProgress { prayer, .. } => match prayer {
                PrayerName::Fajr => "󰖜 ",
                PrayerName::Dhuhr | PrayerName::Asr => "󰖨 ",
                PrayerName::Maghrib => "󰖛 ",
                PrayerName::Isha => " ",
            },
            PeriodState::BetweenPrayers { .. } => "󰖙 ",
        }
    }

    /// Position in the daily sequence, used to spot out-of-order jumps.
    pub(crate) fn ordinal(&self) -> u8 {
        match self {
            PeriodState::BeforeFajr { .. } => 0,
            PeriodState::BetweenPrayers { .. } => 2,
            PeriodState::InProgress { prayer, .. } => match prayer {
                PrayerName::Fajr => 1,
                PrayerName::Dhuhr => 3,
                PrayerName::Asr => 4,
                PrayerName::Maghrib => 5,
                PrayerName::Isha => 6,
            },
            PeriodState::AfterIsha { .. } => 7,
        }
    }
}

impl fmt::Display for PeriodState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// Derive the period for `now`, reporting incomplete or invalid input.
///
/// # Errors
/// * `PeriodError::InvalidTimes` - `today` breaks its ordering invariant
/// * `PeriodError::MissingTomorrow` - `now` is past Islamic midnight and
///   `tomorrow` is unknown, so the next Fajr cannot be named
pub fn try_derive(
    now: DateTime<Utc>,
    today: &DailyPrayerTimes,
    tomorrow: Option<&DailyPrayerTimes>,
) -> Result<PeriodState, PeriodError> {
    today.validate()?;

    if now < today.fajr {
        return Ok(PeriodState::BeforeFajr {
            next_fajr: today.fajr,
        });
    }

    // Fajr is the only window that closes at sunrise rather than at the next prayer
    if now < today.sunrise {
        return Ok(PeriodState::InProgress {
            prayer: PrayerName::Fajr,
            deadline: today.sunrise,
        });
    }

    if now < today.dhuhr {
        return Ok(PeriodState::BetweenPrayers {
            previous: PrayerName::Fajr,
            next: PrayerName::Dhuhr,
            next_start: today.dhuhr,
        });
    }

    for prayer in [PrayerName::Dhuhr, PrayerName::Asr, PrayerName::Maghrib] {
        let Some(next) = prayer.next() else { continue };
        let next_start = today.time_of(next);
        if now < next_start {
            return Ok(PeriodState::InProgress {
                prayer,
                deadline: next_start,
            });
        }
    }

    match (today.midnight, tomorrow) {
        (Some(midnight), _) if now < midnight => Ok(PeriodState::InProgress {
            prayer: PrayerName::Isha,
            deadline: midnight,
        }),
        (Some(_), Some(tomorrow)) => Ok(PeriodState::AfterIsha {
            tomorrow_fajr: tomorrow.fajr,
        }),
        (Some(_), None) => Err(PeriodError::MissingTomorrow),
        (None, Some(tomorrow)) => Ok(PeriodState::InProgress {
            prayer: PrayerName::Isha,
            deadline: tomorrow.fajr,
        }),
        // Open-ended until the next BeforeFajr recomputation
        (None, None) => Ok(PeriodState::InProgress {
            prayer: PrayerName::Isha,
            deadline: today.estimated_next_fajr(),
        }),
    }
}

/// Derive the period for `now`, falling back to the most defensible state.
///
/// Invalid times assert in debug builds and degrade to `BeforeFajr` in release
/// builds. A missing `tomorrow` past midnight extends Isha up to the estimated
/// next Fajr; the scheduler treats that as a signal to refetch.
pub fn derive(
    now: DateTime<Utc>,
    today: &DailyPrayerTimes,
    tomorrow: Option<&DailyPrayerTimes>,
) -> PeriodState {
    match try_derive(now, today, tomorrow) {
        Ok(state) => state,
        Err(err) => {
            if let PeriodError::InvalidTimes(inner) = &err {
                debug_assert!(false, "invalid prayer times: {inner}");
            }
            fallback_state(&err, today)
        }
    }
}

/// The state reported when derivation fails.
///
/// * `MissingTomorrow` - Isha extended up to the estimated next Fajr
/// * `InvalidTimes` - `BeforeFajr` on today's Fajr, the safe default
pub fn fallback_state(err: &PeriodError, today: &DailyPrayerTimes) -> PeriodState {
    match err {
        PeriodError::MissingTomorrow => PeriodState::InProgress {
            prayer: PrayerName::Isha,
            deadline: today.estimated_next_fajr(),
        },
        PeriodError::InvalidTimes(_) => PeriodState::BeforeFajr {
            next_fajr: today.fajr,
        },
    }
}

/// The `[start, end)` window a state covers, when it has a meaningful start.
///
/// `BeforeFajr` and `AfterIsha` span the night across two days and have no
/// window for progress purposes.
pub fn window_bounds(
    state: &PeriodState,
    today: &DailyPrayerTimes,
) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    match *state {
        PeriodState::InProgress { prayer, deadline } => Some((today.time_of(prayer), deadline)),
        PeriodState::BetweenPrayers { next_start, .. } => Some((today.sunrise, next_start)),
        PeriodState::BeforeFajr { .. } | PeriodState::AfterIsha { .. } => None,
    }
}

/// Fraction of `[start, end)` elapsed at `now`, clamped to `[0, 1]`.
pub fn window_progress(now: DateTime<Utc>, start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let total = (end - start).num_milliseconds();
    if total <= 0 {
        return 0.0;
    }
    let elapsed = (now - start).num_milliseconds();
    (elapsed as f64 / total as f64).clamp(0.0, 1.0)
}
