//! Error types crossing the library boundary.
//!
//! Application layers (config, commands, the binary) use `anyhow`; the core and
//! scheduler report failures through these typed enums so observers can tell a
//! retryable hiccup from a broken provider.

use chrono::NaiveDate;

/// A day's prayer times break their ordering invariant.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimesError {
    /// Two consecutive boundaries are not strictly increasing.
    #[error("{later} ({date}) must be strictly after {earlier}")]
    NotIncreasing {
        date: NaiveDate,
        earlier: &'static str,
        later: &'static str,
    },

    /// Islamic midnight is not strictly after Isha.
    #[error("midnight ({date}) must be strictly after isha")]
    MidnightBeforeIsha { date: NaiveDate },

    /// Islamic midnight is not strictly before the following day's Fajr.
    #[error("midnight ({date}) must be strictly before the next day's fajr")]
    MidnightAfterNextFajr { date: NaiveDate },

    /// The following day is not the calendar day after this one.
    #[error("expected times for {expected}, got {actual}")]
    UnexpectedDate {
        expected: NaiveDate,
        actual: NaiveDate,
    },
}

/// Period derivation could not produce a trustworthy state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PeriodError {
    #[error("invalid prayer times: {0}")]
    InvalidTimes(#[from] TimesError),

    /// Past Isha's closing boundary without tomorrow's times.
    #[error("tomorrow's prayer times are required after isha has closed")]
    MissingTomorrow,
}

/// Failure reported by a prayer time provider.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProviderError {
    /// Transient failure (network, file briefly unavailable). Retried.
    #[error("prayer times unavailable for {date}: {reason}")]
    Unavailable { date: NaiveDate, reason: String },

    /// The provider returned data that violates its contract.
    #[error("malformed prayer times for {date}: {reason}")]
    Malformed { date: NaiveDate, reason: String },
}

/// Errors the transition scheduler reports to its observer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SchedulerError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("tomorrow's prayer times missing after isha closed on {date}")]
    MissingTomorrow { date: NaiveDate },

    #[error(transparent)]
    InvalidTimes(#[from] TimesError),

    #[error("notification rescheduling failed: {0}")]
    Notification(String),

    /// No prayer times have been loaded yet.
    #[error("no prayer times loaded")]
    NoData,

    /// `stop()` was called while the operation was in flight.
    #[error("scheduler stopped")]
    Stopped,
}

impl SchedulerError {
    /// True when the provider broke its contract; everything else is retried
    /// or defaulted internally.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            SchedulerError::Provider(ProviderError::Malformed { .. })
                | SchedulerError::InvalidTimes(_)
        )
    }
}
