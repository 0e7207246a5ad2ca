//! State change detection and logging for period transitions.
//!
//! The scheduler re-derives the period on every tick; this module decides
//! whether the new state is worth announcing and logs it in the standard
//! block format.

use crate::core::period::PeriodState;

/// Represents the type of state change that occurred.
#[derive(Debug, PartialEq)]
pub enum StateChange {
    /// Same state, same boundary
    None,
    /// A prayer's window opened
    WindowOpened,
    /// Fajr closed at sunrise and the dead zone began
    DeadZoneEntered,
    /// Isha closed and the night before the next Fajr began
    NightEntered,
    /// The day's timeline restarted (rollover to a fresh BeforeFajr)
    DayStarted,
    /// Same kind of state but the boundary moved (new data for the same period)
    BoundaryShifted,
    /// Skipped or backward movement (clock change, suspend, data replaced)
    UnexpectedJump { from: PeriodState, to: PeriodState },
}

/// Determine the type of state change and log it.
///
/// # Arguments
/// * `current` - The last published state
/// * `new` - The freshly derived state
///
/// # Returns
/// `StateChange` indicating the type of change that occurred
pub fn should_update_state(current: &PeriodState, new: &PeriodState) -> StateChange {
    let change = detect_state_change(current, new);
    log_state_change(&change, new);
    change
}

/// Detect what type of state change occurred between two states.
///
/// Only detects; use `should_update_state()` when you want logging as well.
pub fn detect_state_change(current: &PeriodState, new: &PeriodState) -> StateChange {
    if current == new {
        return StateChange::None;
    }

    let (from, to) = (current.ordinal(), new.ordinal());

    if from == to {
        return StateChange::BoundaryShifted;
    }

    match (current, new) {
        // Normal flow: one step forward in the daily sequence
        _ if to == from + 1 => match new {
            PeriodState::InProgress { .. } => StateChange::WindowOpened,
            PeriodState::BetweenPrayers { .. } => StateChange::DeadZoneEntered,
            PeriodState::AfterIsha { .. } => StateChange::NightEntered,
            PeriodState::BeforeFajr { .. } => StateChange::DayStarted,
        },

        // Rollover: the night of one day hands over to the next day's timeline
        (
            PeriodState::AfterIsha { .. } | PeriodState::InProgress { .. },
            PeriodState::BeforeFajr { .. },
        ) if from >= 6 => StateChange::DayStarted,

        _ => StateChange::UnexpectedJump {
            from: *current,
            to: *new,
        },
    }
}

/// Log the appropriate message for a state change.
fn log_state_change(change: &StateChange, new: &PeriodState) {
    match change {
        StateChange::None => {}
        StateChange::WindowOpened => {
            log_block_start!("{} window open {}", new.display_name(), new.symbol());
            log_indented!("Closes at {}", new.boundary().format("%H:%M:%S UTC"));
        }
        StateChange::DeadZoneEntered => {
            log_block_start!("Fajr window closed at sunrise {}", new.symbol());
            log_indented!(
                "Dhuhr begins at {}",
                new.boundary().format("%H:%M:%S UTC")
            );
        }
        StateChange::NightEntered => {
            log_block_start!("Isha window closed {}", new.symbol());
            log_indented!("Next Fajr at {}", new.boundary().format("%Y-%m-%d %H:%M:%S UTC"));
        }
        StateChange::DayStarted => {
            log_block_start!("New prayer day {}", new.symbol());
            log_indented!("Fajr at {}", new.boundary().format("%Y-%m-%d %H:%M:%S UTC"));
        }
        StateChange::BoundaryShifted => {
            log_decorated!(
                "{} boundary moved to {}",
                new.display_name(),
                new.boundary().format("%H:%M:%S UTC")
            );
        }
        StateChange::UnexpectedJump { from, to } => {
            log_pipe!();
            log_warning!("Unexpected period jump from {} to {}", from, to);
            log_indented!("This may indicate a clock change, suspend, or replaced prayer times");
            log_state_announcement(to);
        }
    }
}

/// Log announcement when entering a period without a known predecessor.
pub fn log_state_announcement(state: &PeriodState) {
    match state {
        PeriodState::InProgress { .. } => {
            log_block_start!("{} window open {}", state.display_name(), state.symbol());
        }
        _ => log_block_start!("Entering {} {}", state.display_name(), state.symbol()),
    }
    log_indented!("Until {}", state.boundary().format("%Y-%m-%d %H:%M:%S UTC"));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::prayer::PrayerName;
    use chrono::{DateTime, TimeZone, Utc};

    fn t(h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 1, h, 0, 0).unwrap()
    }

    fn in_progress(prayer: PrayerName, h: u32) -> PeriodState {
        PeriodState::InProgress {
            prayer,
            deadline: t(h),
        }
    }

    #[test]
    fn test_identical_states_are_no_change() {
        let state = in_progress(PrayerName::Asr, 18);
        assert_eq!(detect_state_change(&state, &state), StateChange::None);
    }

    #[test]
    fn test_forward_steps() {
        let before = PeriodState::BeforeFajr { next_fajr: t(5) };
        let fajr = in_progress(PrayerName::Fajr, 6);
        let dead = PeriodState::BetweenPrayers {
            previous: PrayerName::Fajr,
            next: PrayerName::Dhuhr,
            next_start: t(12),
        };
        let dhuhr = in_progress(PrayerName::Dhuhr, 15);
        let isha = in_progress(PrayerName::Isha, 23);
        let night = PeriodState::AfterIsha { tomorrow_fajr: t(5) };

        assert_eq!(detect_state_change(&before, &fajr), StateChange::WindowOpened);
        assert_eq!(detect_state_change(&fajr, &dead), StateChange::DeadZoneEntered);
        assert_eq!(detect_state_change(&dead, &dhuhr), StateChange::WindowOpened);
        assert_eq!(detect_state_change(&isha, &night), StateChange::NightEntered);
        assert_eq!(detect_state_change(&night, &before), StateChange::DayStarted);
        assert_eq!(detect_state_change(&isha, &before), StateChange::DayStarted);
    }

    #[test]
    fn test_boundary_shift_for_same_state() {
        let a = in_progress(PrayerName::Isha, 23);
        let b = in_progress(PrayerName::Isha, 22);
        assert_eq!(detect_state_change(&a, &b), StateChange::BoundaryShifted);
    }

    #[test]
    fn test_skipping_states_is_unexpected() {
        let fajr = in_progress(PrayerName::Fajr, 6);
        let asr = in_progress(PrayerName::Asr, 18);
        assert_eq!(
            detect_state_change(&fajr, &asr),
            StateChange::UnexpectedJump { from: fajr, to: asr }
        );
        assert!(matches!(
            detect_state_change(&asr, &fajr),
            StateChange::UnexpectedJump { .. }
        ));
    }
}
