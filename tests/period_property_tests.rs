use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use salatr::core::period::window_bounds;
use salatr::core::derive;
use salatr::{DailyPrayerTimes, PeriodState, PrayerName, UrgencyLevel};

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 6, 1).unwrap()
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap())
}

/// Minutes after midnight for fajr, then gaps between consecutive boundaries.
fn day_strategy() -> impl Strategy<Value = (i64, i64, i64, i64, i64, i64, Option<i64>)> {
    (
        180i64..300,
        60i64..100,
        240i64..360,
        120i64..240,
        120i64..240,
        60i64..120,
        proptest::option::of(30i64..60),
    )
}

fn build_day(
    date: NaiveDate,
    (fajr, sunrise, dhuhr, asr, maghrib, isha, midnight): (i64, i64, i64, i64, i64, i64, Option<i64>),
) -> DailyPrayerTimes {
    let start = day_start(date);
    let fajr = start + Duration::minutes(fajr);
    let sunrise = fajr + Duration::minutes(sunrise);
    let dhuhr = sunrise + Duration::minutes(dhuhr);
    let asr = dhuhr + Duration::minutes(asr);
    let maghrib = asr + Duration::minutes(maghrib);
    let isha = maghrib + Duration::minutes(isha);
    DailyPrayerTimes {
        date,
        fajr,
        sunrise,
        dhuhr,
        asr,
        maghrib,
        isha,
        imsak: None,
        sunset: None,
        midnight: midnight.map(|m| isha + Duration::minutes(m)),
        first_third: None,
        last_third: None,
    }
}

/// Position of a state in the day's fixed sequence.
fn rank(state: &PeriodState) -> u8 {
    match state {
        PeriodState::BeforeFajr { .. } => 0,
        PeriodState::InProgress { prayer: PrayerName::Fajr, .. } => 1,
        PeriodState::BetweenPrayers { .. } => 2,
        PeriodState::InProgress { prayer: PrayerName::Dhuhr, .. } => 3,
        PeriodState::InProgress { prayer: PrayerName::Asr, .. } => 4,
        PeriodState::InProgress { prayer: PrayerName::Maghrib, .. } => 5,
        PeriodState::InProgress { prayer: PrayerName::Isha, .. } => 6,
        PeriodState::AfterIsha { .. } => 7,
    }
}

mod derivation_tests {
    use super::*;

    proptest! {
        /// The derived state's window always contains `now`.
        #[test]
        fn test_state_contains_now(gaps in day_strategy(), offset in 0i64..(29 * 60)) {
            let today = build_day(base_date(), gaps);
            let tomorrow = build_day(base_date().succ_opt().unwrap(), gaps);
            let now = day_start(base_date()) + Duration::minutes(offset);
            prop_assume!(now < tomorrow.fajr);

            let state = derive(now, &today, Some(&tomorrow));

            prop_assert!(now < state.boundary());
            match state {
                PeriodState::BeforeFajr { next_fajr } => prop_assert_eq!(next_fajr, today.fajr),
                PeriodState::AfterIsha { tomorrow_fajr } => {
                    prop_assert!(today.midnight.is_some_and(|m| m <= now));
                    prop_assert_eq!(tomorrow_fajr, tomorrow.fajr);
                }
                _ => {
                    let (start, end) = window_bounds(&state, &today).unwrap();
                    prop_assert!(start <= now && now < end);
                }
            }
        }

        /// Later instants never map to an earlier state within one day.
        #[test]
        fn test_states_advance_monotonically(
            gaps in day_strategy(),
            mut offsets in proptest::collection::vec(0i64..(29 * 60), 2..40),
        ) {
            let today = build_day(base_date(), gaps);
            let tomorrow = build_day(base_date().succ_opt().unwrap(), gaps);
            offsets.sort_unstable();

            let ranks: Vec<u8> = offsets
                .iter()
                .map(|m| day_start(base_date()) + Duration::minutes(*m))
                .filter(|now| *now < tomorrow.fajr)
                .map(|now| rank(&derive(now, &today, Some(&tomorrow))))
                .collect();

            prop_assert!(ranks.windows(2).all(|w| w[0] <= w[1]), "ranks went backwards: {:?}", ranks);
        }

        /// The only instants outside every prayer window lie between sunrise and Dhuhr.
        #[test]
        fn test_dead_zone_is_sunrise_to_dhuhr(gaps in day_strategy(), offset in 0i64..(24 * 60)) {
            let today = build_day(base_date(), gaps);
            let tomorrow = build_day(base_date().succ_opt().unwrap(), gaps);
            let now = day_start(base_date()) + Duration::minutes(offset);
            prop_assume!(now >= today.fajr);

            let state = derive(now, &today, Some(&tomorrow));
            let in_dead_zone = today.sunrise <= now && now < today.dhuhr;
            prop_assert_eq!(matches!(state, PeriodState::BetweenPrayers { .. }), in_dead_zone);
        }

        /// Without tomorrow's times and without midnight, Isha stays open.
        #[test]
        fn test_isha_open_ended_without_tomorrow(gaps in day_strategy(), late in 0i64..240) {
            let (fajr, sunrise, dhuhr, asr, maghrib, isha, _) = gaps;
            let today = build_day(base_date(), (fajr, sunrise, dhuhr, asr, maghrib, isha, None));
            let now = today.isha + Duration::minutes(late);

            let state = derive(now, &today, None);
            prop_assert_eq!(
                state,
                PeriodState::InProgress {
                    prayer: PrayerName::Isha,
                    deadline: today.fajr + Duration::hours(24),
                }
            );
        }
    }
}

mod urgency_tests {
    use super::*;

    proptest! {
        /// More time remaining never means a more urgent level.
        #[test]
        fn test_urgency_monotonic(a in -600.0f64..20_000.0, b in -600.0f64..20_000.0) {
            let (more, less) = if a >= b { (a, b) } else { (b, a) };
            prop_assert!(UrgencyLevel::classify(more) <= UrgencyLevel::classify(less));
        }
    }

    #[test]
    fn test_bracket_edges() {
        assert_eq!(UrgencyLevel::classify(120.0 * 60.0), UrgencyLevel::Relaxed);
        assert_eq!(UrgencyLevel::classify(30.0 * 60.0), UrgencyLevel::Elevated);
        assert_eq!(UrgencyLevel::classify(10.0 * 60.0), UrgencyLevel::Elevated);
        assert_eq!(UrgencyLevel::classify(5.0 * 60.0), UrgencyLevel::Urgent);
        assert_eq!(UrgencyLevel::classify(-1.0), UrgencyLevel::Critical);
    }
}
