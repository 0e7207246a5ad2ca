//! Prayer names and one day's prayer timestamps.
//!
//! `DailyPrayerTimes` is produced by an external provider and treated as an
//! immutable value: the scheduler swaps whole days in and out, it never edits
//! a field in place.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::common::constants::ESTIMATED_NEXT_FAJR_HOURS;
use crate::common::error::TimesError;

/// The five daily prayers in the order they occur.
///
/// The derived `Ord` follows declaration order, so `Fajr < Dhuhr < … < Isha`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrayerName {
    Fajr,
    Dhuhr,
    Asr,
    Maghrib,
    Isha,
}

impl PrayerName {
    /// All prayers in daily order.
    pub const ALL: [PrayerName; 5] = [
        PrayerName::Fajr,
        PrayerName::Dhuhr,
        PrayerName::Asr,
        PrayerName::Maghrib,
        PrayerName::Isha,
    ];

    /// The prayer that follows this one on the same day, `None` after Isha.
    pub fn next(self) -> Option<PrayerName> {
        match self {
            PrayerName::Fajr => Some(PrayerName::Dhuhr),
            PrayerName::Dhuhr => Some(PrayerName::Asr),
            PrayerName::Asr => Some(PrayerName::Maghrib),
            PrayerName::Maghrib => Some(PrayerName::Isha),
            PrayerName::Isha => None,
        }
    }

    /// Returns the display name for this prayer.
    pub fn display_name(self) -> &'static str {
        match self {
            PrayerName::Fajr => "Fajr",
            PrayerName::Dhuhr => "Dhuhr",
            PrayerName::Asr => "Asr",
            PrayerName::Maghrib => "Maghrib",
            PrayerName::Isha => "Isha",
        }
    }
}

impl fmt::Display for PrayerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Prayer timestamps for one calendar day.
///
/// All instants are absolute; `date` is the local calendar day they belong to.
/// `midnight` is Islamic midnight (the close of Isha's window) and normally
/// falls on the following calendar day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyPrayerTimes {
    pub date: NaiveDate,
    pub fajr: DateTime<Utc>,
    pub sunrise: DateTime<Utc>,
    pub dhuhr: DateTime<Utc>,
    pub asr: DateTime<Utc>,
    pub maghrib: DateTime<Utc>,
    pub isha: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imsak: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sunset: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub midnight: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_third: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_third: Option<DateTime<Utc>>,
}

impl DailyPrayerTimes {
    /// Start instant of the given prayer.
    pub fn time_of(&self, prayer: PrayerName) -> DateTime<Utc> {
        match prayer {
            PrayerName::Fajr => self.fajr,
            PrayerName::Dhuhr => self.dhuhr,
            PrayerName::Asr => self.asr,
            PrayerName::Maghrib => self.maghrib,
            PrayerName::Isha => self.isha,
        }
    }

    /// Best guess for the following day's Fajr when its real time is unknown.
    pub fn estimated_next_fajr(&self) -> DateTime<Utc> {
        self.fajr + Duration::hours(ESTIMATED_NEXT_FAJR_HOURS)
    }

    /// Check the ordering invariant within this day.
    ///
    /// Fajr < sunrise < Dhuhr < Asr < Maghrib < Isha, and midnight (when
    /// present) strictly after Isha.
    pub fn validate(&self) -> Result<(), TimesError> {
        let sequence = [
            ("fajr", self.fajr),
            ("sunrise", self.sunrise),
            ("dhuhr", self.dhuhr),
            ("asr", self.asr),
            ("maghrib", self.maghrib),
            ("isha", self.isha),
        ];

        for pair in sequence.windows(2) {
            let (earlier, earlier_at) = pair[0];
            let (later, later_at) = pair[1];
            if later_at <= earlier_at {
                return Err(TimesError::NotIncreasing {
                    date: self.date,
                    earlier,
                    later,
                });
            }
        }

        if let Some(midnight) = self.midnight
            && midnight <= self.isha
        {
            return Err(TimesError::MidnightBeforeIsha { date: self.date });
        }

        Ok(())
    }

    /// Check that `next` is a valid successor day for these times.
    pub fn validate_against_next(&self, next: &DailyPrayerTimes) -> Result<(), TimesError> {
        let expected = self.date.succ_opt().unwrap_or(self.date);
        if next.date != expected {
            return Err(TimesError::UnexpectedDate {
                expected,
                actual: next.date,
            });
        }

        if let Some(midnight) = self.midnight
            && midnight >= next.fajr
        {
            return Err(TimesError::MidnightAfterNextFajr { date: self.date });
        }

        Ok(())
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
    }

    #[test]
    fn test_prayer_order_is_daily_order() {
        let mut sorted = PrayerName::ALL;
        sorted.sort();
        assert_eq!(sorted, PrayerName::ALL);
        assert!(PrayerName::Fajr < PrayerName::Isha);
    }

    #[test]
    fn test_next_prayer_chain_ends_after_isha() {
        assert_eq!(PrayerName::Fajr.next(), Some(PrayerName::Dhuhr));
        assert_eq!(PrayerName::Maghrib.next(), Some(PrayerName::Isha));
        assert_eq!(PrayerName::Isha.next(), None);
    }

    #[test]
    fn test_sample_day_is_valid() {
        assert!(sample_day(day()).validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_sunrise_after_dhuhr() {
        let mut times = sample_day(day());
        times.sunrise = at(day(), 12, 30);
        assert_eq!(
            times.validate(),
            Err(TimesError::NotIncreasing {
                date: day(),
                earlier: "sunrise",
                later: "dhuhr",
            })
        );
    }

    #[test]
    fn test_validate_rejects_equal_boundaries() {
        let mut times = sample_day(day());
        times.asr = times.dhuhr;
        assert!(matches!(
            times.validate(),
            Err(TimesError::NotIncreasing { later: "asr", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_midnight_before_isha() {
        let mut times = sample_day(day());
        times.midnight = Some(at(day(), 19, 0));
        assert_eq!(
            times.validate(),
            Err(TimesError::MidnightBeforeIsha { date: day() })
        );
    }

    #[test]
    fn test_validate_against_next_checks_date_and_midnight() {
        let today = sample_day(day());
        let tomorrow = sample_day(day().succ_opt().unwrap());
        assert!(today.validate_against_next(&tomorrow).is_ok());

        let skipped = sample_day(day() + Duration::days(2));
        assert!(matches!(
            today.validate_against_next(&skipped),
            Err(TimesError::UnexpectedDate { .. })
        ));

        let mut late = today.clone();
        late.midnight = Some(tomorrow.fajr + Duration::minutes(1));
        assert_eq!(
            late.validate_against_next(&tomorrow),
            Err(TimesError::MidnightAfterNextFajr { date: day() })
        );
    }

    #[test]
    fn test_time_of_matches_fields() {
        let times = sample_day(day());
        for prayer in PrayerName::ALL {
            let expected = match prayer {
                PrayerName::Fajr => times.fajr,
                PrayerName::Dhuhr => times.dhuhr,
                PrayerName::Asr => times.asr,
                PrayerName::Maghrib => times.maghrib,
                PrayerName::Isha => times.isha,
            };
            assert_eq!(times.time_of(prayer), expected);
        }
    }
}
