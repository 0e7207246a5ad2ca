//! # salatr
//!
//! Prayer period state machine and transition scheduler.
//!
//! The library exists to keep the binary thin and to make the timing logic
//! testable against a virtual clock.
//!
//! ## Architecture
//!
//! - **Core**: `core` holds the data model, urgency classification, and the
//!   pure period derivation
//! - **Scheduler**: `scheduler` re-derives the period on a timeline (day
//!   rollover, sunset, periodic tick) and publishes snapshots to observers
//! - **Time**: `time::source` abstracts the wall clock so tests can simulate
//!   whole days and suspend gaps
//! - **Providers**: `provider` feeds prayer times from a TOML timetable
//! - **Configuration**: `config` for TOML-based settings with validation
//! - **Commands**: `commands` for the `status` and `watch` CLI commands
//! - **Infrastructure**: `common` for logging, constants, and error types

// Import macros from logger module for use in all submodules
#[macro_use]
pub mod common;

pub mod args;
pub mod commands;
pub mod config;
pub mod core;
pub mod provider;
pub mod scheduler;
pub mod time;

pub use common::error::{PeriodError, ProviderError, SchedulerError, TimesError};
pub use core::{DailyPrayerTimes, PeriodState, PrayerName, PrayerPeriod, UrgencyLevel};
pub use scheduler::{
    NotificationRescheduler, PeriodObserver, PrayerTimeProvider, SchedulerSettings,
    TransitionScheduler,
};
