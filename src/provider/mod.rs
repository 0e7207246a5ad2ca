//! Prayer time providers the binary can feed the scheduler with.

pub mod timetable;

pub use timetable::TimetableProvider;
