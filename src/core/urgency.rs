//! Urgency classification of the countdown to the next boundary.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::constants::{
    URGENCY_ELEVATED_MINUTES, URGENCY_NORMAL_MINUTES, URGENCY_RELAXED_MINUTES,
    URGENCY_URGENT_MINUTES,
};

/// How close the current instant is to a window's closing boundary.
///
/// Totally ordered from least to most urgent so consumers can escalate
/// colours and animations with a plain comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Relaxed,
    Normal,
    Elevated,
    Urgent,
    Critical,
}

impl UrgencyLevel {
    /// Classify seconds remaining until the boundary.
    ///
    /// Brackets include their lower bound (exactly 120 minutes is `Relaxed`)
    /// except `Normal`, which starts above 30: exactly 30 minutes is `Elevated`. Negative input lands in `Critical`;
    /// it means the boundary has passed and the state must be re-derived.
    pub fn classify(seconds_remaining: f64) -> Self {
        let minutes = seconds_remaining / 60.0;
        if minutes >= URGENCY_RELAXED_MINUTES {
            UrgencyLevel::Relaxed
        } else if minutes > URGENCY_NORMAL_MINUTES {
            UrgencyLevel::Normal
        } else if minutes >= URGENCY_ELEVATED_MINUTES {
            UrgencyLevel::Elevated
        } else if minutes >= URGENCY_URGENT_MINUTES {
            UrgencyLevel::Urgent
        } else {
            UrgencyLevel::Critical
        }
    }

    /// Classify a chrono duration until the boundary.
    pub fn from_duration(remaining: Duration) -> Self {
        Self::classify(remaining.num_milliseconds() as f64 / 1000.0)
    }

    /// Returns the display name for this level.
    pub fn display_name(self) -> &'static str {
        match self {
            UrgencyLevel::Relaxed => "relaxed",
            UrgencyLevel::Normal => "normal",
            UrgencyLevel::Elevated => "elevated",
            UrgencyLevel::Urgent => "urgent",
            UrgencyLevel::Critical => "critical",
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(m: f64) -> f64 {
        m * 60.0
    }

    #[test]
    fn test_bracket_boundaries() {
        assert_eq!(UrgencyLevel::classify(minutes(120.0)), UrgencyLevel::Relaxed);
        assert_eq!(UrgencyLevel::classify(minutes(119.9)), UrgencyLevel::Normal);
        assert_eq!(UrgencyLevel::classify(minutes(30.0)), UrgencyLevel::Elevated);
        assert_eq!(UrgencyLevel::classify(minutes(30.01)), UrgencyLevel::Normal);
        assert_eq!(UrgencyLevel::classify(minutes(10.0)), UrgencyLevel::Elevated);
        assert_eq!(UrgencyLevel::classify(minutes(9.99)), UrgencyLevel::Urgent);
        assert_eq!(UrgencyLevel::classify(minutes(5.0)), UrgencyLevel::Urgent);
        assert_eq!(UrgencyLevel::classify(minutes(4.99)), UrgencyLevel::Critical);
    }

    #[test]
    fn test_negative_remaining_is_critical() {
        assert_eq!(UrgencyLevel::classify(-1.0), UrgencyLevel::Critical);
        assert_eq!(UrgencyLevel::classify(0.0), UrgencyLevel::Critical);
    }

    #[test]
    fn test_levels_are_totally_ordered() {
        assert!(UrgencyLevel::Relaxed < UrgencyLevel::Normal);
        assert!(UrgencyLevel::Normal < UrgencyLevel::Elevated);
        assert!(UrgencyLevel::Elevated < UrgencyLevel::Urgent);
        assert!(UrgencyLevel::Urgent < UrgencyLevel::Critical);
    }

    #[test]
    fn test_from_duration_matches_classify() {
        assert_eq!(
            UrgencyLevel::from_duration(Duration::minutes(45)),
            UrgencyLevel::Normal
        );
        assert_eq!(
            UrgencyLevel::from_duration(Duration::minutes(4)),
            UrgencyLevel::Critical
        );
    }
}
