//! Prayer period core: the data model, urgency classification, and period
//! derivation. Everything here is pure and synchronous; the scheduler drives it
//! on a timeline.

pub mod period;
pub mod prayer;
pub mod urgency;

pub use period::{PeriodState, PrayerPeriod, derive, try_derive};
pub use prayer::{DailyPrayerTimes, PrayerName};
pub use urgency::UrgencyLevel;
