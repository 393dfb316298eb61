//! Bench-wide default constants.
//!
//! These are the values the station has always run with; every one of them
//! can be overridden from `bench_config.toml`. Grouped by subsystem.

// ============================================================================
// Device
// ============================================================================

/// DAQ module the channels are wired to.
pub const DEVICE_NAME: &str = "cDAQ1Mod1";

/// Configured input range of the DAQ (volts).
pub const VOLTAGE_RANGE_MIN: f64 = 0.0;
pub const VOLTAGE_RANGE_MAX: f64 = 5.0;

/// One sample per second.
pub const SAMPLING_RATE_HZ: f64 = 1.0;

// ============================================================================
// Signal Thresholds
// ============================================================================

/// Voltage at or above which a relay/lamp/buzzer line is ON.
pub const ON_THRESHOLD_V: f64 = 4.6;

/// Door voltage below this is CLOSED (inverted polarity).
pub const DOOR_CLOSED_BELOW_V: f64 = 0.5;

/// Door voltage band reported as OPEN (inclusive both ends).
pub const DOOR_OPEN_MIN_V: f64 = 4.5;
pub const DOOR_OPEN_MAX_V: f64 = 5.0;

/// Out-of-range warning limits.
pub const OUT_OF_RANGE_HIGH_V: f64 = 5.5;
pub const OUT_OF_RANGE_LOW_V: f64 = -0.5;

// ============================================================================
// Power Aggregation
// ============================================================================

/// Power% is computed over the last N samples.
pub const POWER_WINDOW_SAMPLES: usize = 100;

/// Recorded sample history capacity (oldest evicted first).
///
/// 10 000 samples = ~2.8 hours at 1 Hz.
pub const HISTORY_CAPACITY: usize = 10_000;

// ============================================================================
// Warnings
// ============================================================================

/// MW + Grill simultaneous ON longer than this raises an overlap warning.
pub const OVERLAP_TOLERANCE_SECS: f64 = 2.0;

// ============================================================================
// Pass / Fail
// ============================================================================

/// Symmetric tolerance around expected power (percentage points).
pub const PASS_FAIL_TOLERANCE_PERCENT: f64 = 5.0;

// ============================================================================
// Defrost
// ============================================================================

pub const DEFROST_WEIGHT_STEP_GRAMS: f64 = 100.0;

/// Minutes of defrost per weight step.
pub const DEFROST_CONSTANT_FACTOR: f64 = 2.05;

pub const DEFROST_MIN_WEIGHT_GRAMS: f64 = 100.0;
pub const DEFROST_MAX_WEIGHT_GRAMS: f64 = 2000.0;

// ============================================================================
// Run-State Machine
// ============================================================================

/// Inactivity before the oven is considered asleep (15 min).
pub const SLEEP_TIMEOUT_SECS: u64 = 900;

// ============================================================================
// Storage
// ============================================================================

/// Default location of the test report database.
pub const REPORT_DB_PATH: &str = "./data/reports.db";

/// Reports older than this are pruned on startup.
pub const REPORT_RETENTION_DAYS: i64 = 365;
