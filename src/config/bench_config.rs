//! Bench Configuration - every threshold and constant as an operator-tunable TOML value
//!
//! Each struct implements `Default` with the station's historical constants,
//! so a bench with no config file behaves exactly as before.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::defaults;
use crate::analysis::power::ExportWindowing;
use crate::analysis::warnings::OverlapPolicy;
use crate::types::Channel;

/// Environment variable pointing at a config file.
pub const CONFIG_ENV_VAR: &str = "OVEN_QC_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "bench_config.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a test station.
///
/// Load with `BenchConfig::load()` which searches:
/// 1. `$OVEN_QC_CONFIG` env var
/// 2. `./bench_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct BenchConfig {
    /// DAQ device and sampling
    #[serde(default)]
    pub device: DeviceConfig,

    /// Signal thresholds and physical line mapping
    #[serde(default)]
    pub channels: ChannelConfig,

    /// Power% window and history sizing
    #[serde(default)]
    pub power: PowerConfig,

    /// Warning detector tuning
    #[serde(default)]
    pub warnings: WarningConfig,

    /// Pass/fail tolerance
    #[serde(default)]
    pub pass_fail: PassFailConfig,

    /// Defrost formula and sector constants
    #[serde(default)]
    pub defrost: DefrostConfig,

    /// Run-state machine tuning
    #[serde(default)]
    pub state_machine: StateMachineConfig,

    /// Which channels stand in for operator interactions
    #[serde(default)]
    pub interaction: InteractionConfig,

    /// Report persistence
    #[serde(default)]
    pub storage: StorageConfig,
}

impl BenchConfig {
    /// Load configuration using the standard search order:
    /// 1. `$OVEN_QC_CONFIG` environment variable
    /// 2. `./bench_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), device = %config.device.name, "Loaded bench config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(device = %config.device.name, "Loaded bench config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents).map_err(|e| match e {
            ConfigError::Toml(err) => ConfigError::Parse(path.to_path_buf(), err),
            other => other,
        })
    }

    /// Parse and validate a TOML document.
    ///
    /// Unknown keys are logged as warnings and never fail the load.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        for w in &super::validation::validate_unknown_keys(contents) {
            warn!("{}", w);
        }

        let config: Self = toml::from_str(contents).map_err(ConfigError::Toml)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the current config to a TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Write config to a file (used by `oven-qc init-config`).
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let contents = self.to_toml()?;
        std::fs::write(path, contents).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        info!(path = %path.display(), "Bench config saved");
        Ok(())
    }

    /// Validate all values for internal consistency.
    ///
    /// Rules:
    /// - Door bands must be ordered: closed < open_min <= open_max
    /// - Out-of-range limits must be ordered
    /// - Window, history, sampling rate and timeouts must be positive
    /// - Defrost sector percentages must sum to 1.0
    /// - Physical line names must be unique
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let c = &self.channels;
        if c.door_closed_below_v >= c.door_open_min_v {
            errors.push(format!(
                "channels.door_closed_below_v ({:.2}) must be below door_open_min_v ({:.2})",
                c.door_closed_below_v, c.door_open_min_v
            ));
        }
        if c.door_open_min_v > c.door_open_max_v {
            errors.push(format!(
                "channels.door_open_min_v ({:.2}) must be <= door_open_max_v ({:.2})",
                c.door_open_min_v, c.door_open_max_v
            ));
        }
        if c.out_of_range_low_v >= c.out_of_range_high_v {
            errors.push(format!(
                "channels.out_of_range_low_v ({:.2}) must be below out_of_range_high_v ({:.2})",
                c.out_of_range_low_v, c.out_of_range_high_v
            ));
        }

        let mut seen = HashSet::new();
        for ch in Channel::ALL {
            let line = c.lines.line(ch);
            if line.trim().is_empty() {
                errors.push(format!("channels.lines.{} must not be empty", ch.config_key()));
            } else if !seen.insert(line) {
                errors.push(format!(
                    "channels.lines.{} = '{}' is wired to more than one channel",
                    ch.config_key(),
                    line
                ));
            }
        }

        if self.device.sampling_rate_hz <= 0.0 {
            errors.push("device.sampling_rate_hz must be > 0".to_string());
        }
        if self.power.window_samples == 0 {
            errors.push("power.window_samples must be > 0".to_string());
        }
        if self.power.history_capacity < self.power.window_samples {
            errors.push(format!(
                "power.history_capacity ({}) must be >= power.window_samples ({})",
                self.power.history_capacity, self.power.window_samples
            ));
        }
        if self.warnings.overlap_tolerance_secs < 0.0 {
            errors.push("warnings.overlap_tolerance_secs cannot be negative".to_string());
        }
        if self.pass_fail.tolerance_percent < 0.0 {
            errors.push("pass_fail.tolerance_percent cannot be negative".to_string());
        }
        if self.state_machine.sleep_timeout_secs == 0 {
            errors.push("state_machine.sleep_timeout_secs must be > 0".to_string());
        }

        let d = &self.defrost;
        if d.weight_step_grams <= 0.0 {
            errors.push("defrost.weight_step_grams must be > 0 (used as divisor)".to_string());
        }
        if d.constant_factor <= 0.0 {
            errors.push("defrost.constant_factor must be > 0".to_string());
        }
        if d.min_weight_grams <= 0.0 || d.min_weight_grams > d.max_weight_grams {
            errors.push(format!(
                "defrost weight range {:.0}-{:.0} g is invalid",
                d.min_weight_grams, d.max_weight_grams
            ));
        }
        if d.sectors.is_empty() {
            errors.push("defrost.sectors must contain at least one sector".to_string());
        } else {
            let sum: f64 = d.sectors.iter().map(|s| s.percentage).sum();
            if (sum - 1.0).abs() > 1e-6 {
                errors.push(format!(
                    "defrost sector percentages must sum to 1.0, got {sum:.4}"
                ));
            }
            for s in &d.sectors {
                if s.percentage <= 0.0 {
                    errors.push(format!("defrost sector '{}' percentage must be > 0", s.name));
                }
                if s.period_secs <= 0.0 {
                    errors.push(format!("defrost sector '{}' period_secs must be > 0", s.name));
                }
            }
        }

        let (range_errors, range_warnings) = super::validation::validate_physical_ranges(self);
        errors.extend(range_errors);
        for w in &range_warnings {
            warn!("{}", w);
        }

        // NaN/Inf comparisons silently pass the checks above
        if toml::Value::try_from(self).is_ok_and(|v| has_non_finite(&v)) {
            errors.push(
                "Config contains NaN or Inf values, all thresholds must be finite numbers"
                    .to_string(),
            );
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

fn has_non_finite(value: &toml::Value) -> bool {
    match value {
        toml::Value::Float(f) => !f.is_finite(),
        toml::Value::Array(items) => items.iter().any(has_non_finite),
        toml::Value::Table(table) => table.values().any(has_non_finite),
        _ => false,
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Toml(toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            Self::Parse(path, e) => write!(f, "Config parse error ({}): {}", path.display(), e),
            Self::Toml(e) => write!(f, "Config parse error: {e}"),
            Self::Serialize(e) => write!(f, "Config serialization error: {e}"),
            Self::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {e}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Device
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeviceConfig {
    /// DAQ module identifier (appears in logs and reports)
    #[serde(default = "default_device_name")]
    pub name: String,

    /// Configured DAQ input range (V)
    #[serde(default = "default_voltage_range_min")]
    pub voltage_range_min: f64,

    #[serde(default = "default_voltage_range_max")]
    pub voltage_range_max: f64,

    /// Sampling cadence of the recording loop
    #[serde(default = "default_sampling_rate_hz")]
    pub sampling_rate_hz: f64,
}

fn default_device_name() -> String { defaults::DEVICE_NAME.to_string() }
fn default_voltage_range_min() -> f64 { defaults::VOLTAGE_RANGE_MIN }
fn default_voltage_range_max() -> f64 { defaults::VOLTAGE_RANGE_MAX }
fn default_sampling_rate_hz() -> f64 { defaults::SAMPLING_RATE_HZ }

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: default_device_name(),
            voltage_range_min: default_voltage_range_min(),
            voltage_range_max: default_voltage_range_max(),
            sampling_rate_hz: default_sampling_rate_hz(),
        }
    }
}

impl DeviceConfig {
    /// Interval between samples.
    pub fn sample_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs_f64(1.0 / self.sampling_rate_hz.max(f64::MIN_POSITIVE))
    }
}

// ============================================================================
// Channels
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelConfig {
    /// Non-door channels are ON at or above this voltage
    #[serde(default = "default_on_threshold")]
    pub on_threshold_v: f64,

    /// Door is CLOSED below this voltage
    #[serde(default = "default_door_closed_below")]
    pub door_closed_below_v: f64,

    /// Door OPEN band, inclusive
    #[serde(default = "default_door_open_min")]
    pub door_open_min_v: f64,

    #[serde(default = "default_door_open_max")]
    pub door_open_max_v: f64,

    /// Out-of-range warning limits
    #[serde(default = "default_out_of_range_high")]
    pub out_of_range_high_v: f64,

    #[serde(default = "default_out_of_range_low")]
    pub out_of_range_low_v: f64,

    /// Physical DAQ input per channel
    #[serde(default)]
    pub lines: ChannelLines,
}

fn default_on_threshold() -> f64 { defaults::ON_THRESHOLD_V }
fn default_door_closed_below() -> f64 { defaults::DOOR_CLOSED_BELOW_V }
fn default_door_open_min() -> f64 { defaults::DOOR_OPEN_MIN_V }
fn default_door_open_max() -> f64 { defaults::DOOR_OPEN_MAX_V }
fn default_out_of_range_high() -> f64 { defaults::OUT_OF_RANGE_HIGH_V }
fn default_out_of_range_low() -> f64 { defaults::OUT_OF_RANGE_LOW_V }

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            on_threshold_v: default_on_threshold(),
            door_closed_below_v: default_door_closed_below(),
            door_open_min_v: default_door_open_min(),
            door_open_max_v: default_door_open_max(),
            out_of_range_high_v: default_out_of_range_high(),
            out_of_range_low_v: default_out_of_range_low(),
            lines: ChannelLines::default(),
        }
    }
}

/// Analog input line each channel is wired to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChannelLines {
    #[serde(default = "default_line_door")]
    pub door: String,
    #[serde(default = "default_line_lamp")]
    pub lamp: String,
    #[serde(default = "default_line_microwave")]
    pub microwave: String,
    #[serde(default = "default_line_grill")]
    pub grill: String,
    #[serde(default = "default_line_buzzer")]
    pub buzzer: String,
}

fn default_line_door() -> String { "ai0".to_string() }
fn default_line_lamp() -> String { "ai1".to_string() }
fn default_line_microwave() -> String { "ai2".to_string() }
fn default_line_grill() -> String { "ai3".to_string() }
fn default_line_buzzer() -> String { "ai4".to_string() }

impl Default for ChannelLines {
    fn default() -> Self {
        Self {
            door: default_line_door(),
            lamp: default_line_lamp(),
            microwave: default_line_microwave(),
            grill: default_line_grill(),
            buzzer: default_line_buzzer(),
        }
    }
}

impl ChannelLines {
    pub fn line(&self, channel: Channel) -> &str {
        match channel {
            Channel::Door => &self.door,
            Channel::Lamp => &self.lamp,
            Channel::Microwave => &self.microwave,
            Channel::Grill => &self.grill,
            Channel::Buzzer => &self.buzzer,
        }
    }
}

// ============================================================================
// Power
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PowerConfig {
    /// Trailing window length for power% (samples)
    #[serde(default = "default_window_samples")]
    pub window_samples: usize,

    /// Recorded history capacity (samples)
    #[serde(default = "default_history_capacity")]
    pub history_capacity: usize,

    /// Window convention for per-row power% in exports
    #[serde(default)]
    pub export_windowing: ExportWindowing,
}

fn default_window_samples() -> usize { defaults::POWER_WINDOW_SAMPLES }
fn default_history_capacity() -> usize { defaults::HISTORY_CAPACITY }

impl Default for PowerConfig {
    fn default() -> Self {
        Self {
            window_samples: default_window_samples(),
            history_capacity: default_history_capacity(),
            export_windowing: ExportWindowing::default(),
        }
    }
}

// ============================================================================
// Warnings
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WarningConfig {
    /// Allowed MW + Grill simultaneous-ON time before warning (s)
    #[serde(default = "default_overlap_tolerance")]
    pub overlap_tolerance_secs: f64,

    /// off / once / repeating
    #[serde(default)]
    pub overlap_policy: OverlapPolicy,

    /// Warn on door voltages between the closed and open bands
    #[serde(default = "default_true")]
    pub warn_door_indeterminate: bool,
}

fn default_overlap_tolerance() -> f64 { defaults::OVERLAP_TOLERANCE_SECS }
const fn default_true() -> bool { true }

impl Default for WarningConfig {
    fn default() -> Self {
        Self {
            overlap_tolerance_secs: default_overlap_tolerance(),
            overlap_policy: OverlapPolicy::default(),
            warn_door_indeterminate: true,
        }
    }
}

// ============================================================================
// Pass / Fail
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct PassFailConfig {
    /// Symmetric band around expected power (percentage points)
    #[serde(default = "default_tolerance_percent")]
    pub tolerance_percent: f64,
}

fn default_tolerance_percent() -> f64 { defaults::PASS_FAIL_TOLERANCE_PERCENT }

impl Default for PassFailConfig {
    fn default() -> Self {
        Self {
            tolerance_percent: default_tolerance_percent(),
        }
    }
}

// ============================================================================
// Defrost
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefrostConfig {
    #[serde(default = "default_weight_step")]
    pub weight_step_grams: f64,

    /// total_minutes = constant_factor × (weight / weight_step)
    #[serde(default = "default_constant_factor")]
    pub constant_factor: f64,

    #[serde(default = "default_min_weight")]
    pub min_weight_grams: f64,

    #[serde(default = "default_max_weight")]
    pub max_weight_grams: f64,

    /// Sector table in cycle order
    #[serde(default = "default_sectors")]
    pub sectors: Vec<SectorConfig>,
}

fn default_weight_step() -> f64 { defaults::DEFROST_WEIGHT_STEP_GRAMS }
fn default_constant_factor() -> f64 { defaults::DEFROST_CONSTANT_FACTOR }
fn default_min_weight() -> f64 { defaults::DEFROST_MIN_WEIGHT_GRAMS }
fn default_max_weight() -> f64 { defaults::DEFROST_MAX_WEIGHT_GRAMS }

fn default_sectors() -> Vec<SectorConfig> {
    vec![
        SectorConfig::new("Sector 1", 0.14, 36.7, 11.0, 19.0, 30.0),
        SectorConfig::new("Sector 2", 0.50, 23.3, 7.0, 23.0, 30.0),
        SectorConfig::new("Sector 3", 0.36, 30.0, 9.0, 21.0, 30.0),
    ]
}

impl Default for DefrostConfig {
    fn default() -> Self {
        Self {
            weight_step_grams: default_weight_step(),
            constant_factor: default_constant_factor(),
            min_weight_grams: default_min_weight(),
            max_weight_grams: default_max_weight(),
            sectors: default_sectors(),
        }
    }
}

/// Fixed constants of one defrost sector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SectorConfig {
    pub name: String,
    /// Share of total defrost time (0-1)
    pub percentage: f64,
    /// Expected microwave power (%)
    pub power: f64,
    pub on_secs: f64,
    pub off_secs: f64,
    pub period_secs: f64,
}

impl SectorConfig {
    pub fn new(
        name: &str,
        percentage: f64,
        power: f64,
        on_secs: f64,
        off_secs: f64,
        period_secs: f64,
    ) -> Self {
        Self {
            name: name.to_string(),
            percentage,
            power,
            on_secs,
            off_secs,
            period_secs,
        }
    }
}

// ============================================================================
// Run-State Machine
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct StateMachineConfig {
    /// Inactivity before SLEEP (s)
    #[serde(default = "default_sleep_timeout")]
    pub sleep_timeout_secs: u64,
}

const fn default_sleep_timeout() -> u64 { defaults::SLEEP_TIMEOUT_SECS }

impl Default for StateMachineConfig {
    fn default() -> Self {
        Self {
            sleep_timeout_secs: default_sleep_timeout(),
        }
    }
}

// ============================================================================
// Interaction Mapping
// ============================================================================

/// Channels whose ON state stands in for an operator interaction.
///
/// The bench has no dedicated button lines; by default the buzzer (which
/// beeps on every key press) is read as "start pressed". Unbound signals are
/// always false. `door_open` always comes from the door channel.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct InteractionConfig {
    #[serde(default = "default_start_channel")]
    pub start: Option<Channel>,
    #[serde(default)]
    pub cancel: Option<Channel>,
    #[serde(default)]
    pub knob: Option<Channel>,
    #[serde(default)]
    pub lock: Option<Channel>,
    #[serde(default)]
    pub unlock: Option<Channel>,
}

#[allow(clippy::unnecessary_wraps)]
const fn default_start_channel() -> Option<Channel> { Some(Channel::Buzzer) }

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            start: default_start_channel(),
            cancel: None,
            knob: None,
            lock: None,
            unlock: None,
        }
    }
}

// ============================================================================
// Storage
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfig {
    /// sled database holding finished test reports
    #[serde(default = "default_report_db_path")]
    pub report_db_path: PathBuf,

    /// Reports older than this are pruned at startup
    #[serde(default = "default_retention_days")]
    pub retention_days: i64,
}

fn default_report_db_path() -> PathBuf { PathBuf::from(defaults::REPORT_DB_PATH) }
const fn default_retention_days() -> i64 { defaults::REPORT_RETENTION_DAYS }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            report_db_path: default_report_db_path(),
            retention_days: default_retention_days(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        BenchConfig::default().validate().unwrap();
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = BenchConfig::from_toml_str("").unwrap();
        assert_eq!(config, BenchConfig::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config = BenchConfig::from_toml_str(
            r#"
[power]
window_samples = 50

[interaction]
cancel = "lamp"
"#,
        )
        .unwrap();
        assert_eq!(config.power.window_samples, 50);
        assert_eq!(config.power.history_capacity, defaults::HISTORY_CAPACITY);
        assert_eq!(config.interaction.start, Some(Channel::Buzzer));
        assert_eq!(config.interaction.cancel, Some(Channel::Lamp));
    }

    #[test]
    fn toml_round_trip() {
        let config = BenchConfig::default();
        let text = config.to_toml().unwrap();
        let parsed = BenchConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn sector_percentages_must_sum_to_one() {
        let mut config = BenchConfig::default();
        config.defrost.sectors[0].percentage = 0.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("sum to 1.0"));
    }

    #[test]
    fn inverted_door_bands_rejected() {
        let mut config = BenchConfig::default();
        config.channels.door_closed_below_v = 4.8;
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_lines_rejected() {
        let mut config = BenchConfig::default();
        config.channels.lines.grill = "ai2".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("more than one channel"));
    }

    #[test]
    fn history_smaller_than_window_rejected() {
        let mut config = BenchConfig::default();
        config.power.history_capacity = 10;
        assert!(config.validate().is_err());
    }

    #[test]
    fn sample_period_from_rate() {
        let mut device = DeviceConfig::default();
        assert_eq!(device.sample_period(), std::time::Duration::from_secs(1));
        device.sampling_rate_hz = 4.0;
        assert_eq!(device.sample_period(), std::time::Duration::from_millis(250));
    }
}
