//! Application constants and default values for salatr.
//!
//! Configuration defaults, validation limits, and the fixed thresholds used by
//! the period deriver and transition scheduler.

// ═══ Application Configuration Defaults ═══
// Used when config options are not specified by the user

pub const DEFAULT_TIMEZONE: &str = "UTC";
pub const DEFAULT_TIMETABLE_FILE: &str = "timetable.toml";
pub const DEFAULT_RECALCULATION_INTERVAL: u64 = 300; // seconds - periodic re-derivation cadence
pub const DEFAULT_ROLLOVER_BUFFER: u64 = 5; // seconds after local midnight
pub const DEFAULT_SUNSET_BUFFER: u64 = 2; // seconds after Maghrib
pub const DEFAULT_URGENT_THRESHOLD: u64 = 30; // minutes remaining before a boundary

pub const CONFIG_FILE_NAME: &str = "salatr.toml";
pub const CONFIG_DIR_NAME: &str = "salatr";

// ═══ Validation Limits ═══

pub const MINIMUM_RECALCULATION_INTERVAL: u64 = 30; // seconds
pub const MAXIMUM_RECALCULATION_INTERVAL: u64 = 3600; // seconds

pub const MAXIMUM_BOUNDARY_BUFFER: u64 = 300; // seconds, applies to both buffers

pub const MINIMUM_URGENT_THRESHOLD: u64 = 1; // minutes
pub const MAXIMUM_URGENT_THRESHOLD: u64 = 120; // minutes

// ═══ Urgency Brackets ═══
// Minutes remaining. Lower bounds are inclusive except Normal's: exactly
// 30 minutes already classifies as Elevated

pub const URGENCY_RELAXED_MINUTES: f64 = 120.0;
pub const URGENCY_NORMAL_MINUTES: f64 = 30.0;
pub const URGENCY_ELEVATED_MINUTES: f64 = 10.0;
pub const URGENCY_URGENT_MINUTES: f64 = 5.0;

// ═══ Period Derivation ═══

/// Hours added to today's Fajr when tomorrow's times are unknown.
pub const ESTIMATED_NEXT_FAJR_HOURS: i64 = 24;

// ═══ Timetable ═══

pub const TIMETABLE_LOW_COVERAGE_DAYS: i64 = 3; // warn in `status` below this

// ═══ Exit Codes ═══

pub const EXIT_FAILURE: i32 = 1;
