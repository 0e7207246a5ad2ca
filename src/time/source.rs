//! Time source abstraction for real and simulated wall-clock time.
//!
//! The scheduler asks a `TimeSource` for "now" instead of calling the system
//! clock directly. Timers themselves always run on tokio's clock, so a
//! simulated source anchored to tokio's (pausable) clock lets tests advance
//! virtual time across a whole day in milliseconds.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::sync::Mutex;
use tokio::time::Instant;

/// Trait for abstracting wall-clock reads.
pub trait TimeSource: Send + Sync {
    /// Get the current wall-clock instant
    fn now(&self) -> DateTime<Utc>;

    /// Check if this is a simulated time source
    fn is_simulated(&self) -> bool {
        false
    }
}

/// Real-time implementation backed by the system clock.
///
/// Unlike a monotonic timer this jumps forward after a suspend, which is
/// exactly what the periodic tick's date check relies on.
pub struct RealTimeSource;

impl TimeSource for RealTimeSource {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Simulated wall clock that follows tokio's clock.
///
/// Wall time = `start + (tokio elapsed since creation) + jumped`. Under
/// `tokio::time::pause()` tokio time only moves when advanced, so the wall
/// clock moves in lock-step with timers. [`jump`](Self::jump) moves the wall
/// clock without letting any timer fire, which is how a process suspended
/// across midnight looks to the scheduler when it resumes.
pub struct SimulatedTimeSource {
    start_time: DateTime<Utc>,
    anchor: Instant,
    jumped: Mutex<ChronoDuration>,
}

impl SimulatedTimeSource {
    /// Create a simulated clock reading `start_time` right now.
    pub fn new(start_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            anchor: Instant::now(),
            jumped: Mutex::new(ChronoDuration::zero()),
        }
    }

    /// Move the wall clock forward without advancing tokio time.
    pub fn jump(&self, by: ChronoDuration) {
        let mut jumped = self.jumped.lock().unwrap_or_else(|e| e.into_inner());
        *jumped += by;
    }

    fn elapsed(&self) -> ChronoDuration {
        ChronoDuration::from_std(self.anchor.elapsed()).unwrap_or_else(|_| ChronoDuration::zero())
    }
}

impl TimeSource for SimulatedTimeSource {
    fn now(&self) -> DateTime<Utc> {
        let jumped = *self.jumped.lock().unwrap_or_else(|e| e.into_inner());
        self.start_time + self.elapsed() + jumped
    }

    fn is_simulated(&self) -> bool {
        true
    }
}

/// Duration from `now` until `deadline`, zero if it has passed.
pub fn until(now: DateTime<Utc>, deadline: DateTime<Utc>) -> std::time::Duration {
    (deadline - now).to_std().unwrap_or(std::time::Duration::ZERO)
}

/// Parse a datetime string in the format "YYYY-MM-DD HH:MM:SS" in `tz`.
pub fn parse_datetime_in_tz(s: &str, tz: chrono_tz::Tz) -> Result<DateTime<Utc>, String> {
    use chrono::{NaiveDateTime, TimeZone};

    let naive = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map_err(|e| format!("Invalid datetime format: {e}. Use YYYY-MM-DD HH:MM:SS"))?;
    tz.from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| format!("Ambiguous or invalid time in timezone {tz}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test(start_paused = true)]
    async fn test_simulated_source_follows_tokio_clock() {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 23, 59, 0).unwrap();
        let clock = SimulatedTimeSource::new(start);
        assert_eq!(clock.now(), start);

        tokio::time::advance(std::time::Duration::from_secs(90)).await;
        assert_eq!(clock.now(), start + ChronoDuration::seconds(90));
    }

    #[tokio::test(start_paused = true)]
    async fn test_jump_moves_wall_clock_only() {
        let start = Utc.with_ymd_and_hms(2026, 6, 1, 22, 0, 0).unwrap();
        let clock = SimulatedTimeSource::new(start);
        let before = Instant::now();

        clock.jump(ChronoDuration::hours(9));

        assert_eq!(clock.now(), start + ChronoDuration::hours(9));
        assert_eq!(Instant::now(), before);
        assert!(clock.is_simulated());
    }

    #[test]
    fn test_until_saturates_at_zero() {
        let now = Utc.with_ymd_and_hms(2026, 6, 1, 12, 0, 0).unwrap();
        assert_eq!(
            until(now, now + ChronoDuration::seconds(5)),
            std::time::Duration::from_secs(5)
        );
        assert_eq!(until(now, now - ChronoDuration::seconds(5)), std::time::Duration::ZERO);
    }

    #[test]
    fn test_parse_datetime_in_tz() {
        let parsed = parse_datetime_in_tz("2026-06-01 05:30:00", chrono_tz::Europe::London).unwrap();
        // BST is UTC+1 in June
        assert_eq!(parsed, Utc.with_ymd_and_hms(2026, 6, 1, 4, 30, 0).unwrap());
        assert!(parse_datetime_in_tz("05:30", chrono_tz::UTC).is_err());
    }
}
