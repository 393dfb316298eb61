//! Config validation: unknown-key detection with Levenshtein suggestions
//! and physical range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use crate::types::Channel;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, " (did you mean '{s}'?)")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Returns the complete set of valid dotted key paths for BenchConfig.
///
/// Maintained manually to match the struct hierarchy in bench_config.rs.
/// Entries of `[[defrost.sectors]]` are reported under `defrost.sectors.*`.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [device]
        "device",
        "device.name",
        "device.voltage_range_min",
        "device.voltage_range_max",
        "device.sampling_rate_hz",
        // [channels]
        "channels",
        "channels.on_threshold_v",
        "channels.door_closed_below_v",
        "channels.door_open_min_v",
        "channels.door_open_max_v",
        "channels.out_of_range_high_v",
        "channels.out_of_range_low_v",
        // [channels.lines]
        "channels.lines",
        "channels.lines.door",
        "channels.lines.lamp",
        "channels.lines.microwave",
        "channels.lines.grill",
        "channels.lines.buzzer",
        // [power]
        "power",
        "power.window_samples",
        "power.history_capacity",
        "power.export_windowing",
        // [warnings]
        "warnings",
        "warnings.overlap_tolerance_secs",
        "warnings.overlap_policy",
        "warnings.warn_door_indeterminate",
        // [pass_fail]
        "pass_fail",
        "pass_fail.tolerance_percent",
        // [defrost]
        "defrost",
        "defrost.weight_step_grams",
        "defrost.constant_factor",
        "defrost.min_weight_grams",
        "defrost.max_weight_grams",
        // [[defrost.sectors]]
        "defrost.sectors",
        "defrost.sectors.name",
        "defrost.sectors.percentage",
        "defrost.sectors.power",
        "defrost.sectors.on_secs",
        "defrost.sectors.off_secs",
        "defrost.sectors.period_secs",
        // [state_machine]
        "state_machine",
        "state_machine.sleep_timeout_secs",
        // [interaction]
        "interaction",
        "interaction.start",
        "interaction.cancel",
        "interaction.knob",
        "interaction.lock",
        "interaction.unlock",
        // [storage]
        "storage",
        "storage.report_db_path",
        "storage.retention_days",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`. Tables inside arrays share the array's path.
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            } else if let Some(items) = v.as_array() {
                for item in items.iter().filter(|i| i.is_table()) {
                    for nested in walk_toml_keys(item, &path) {
                        if !keys.contains(&nested) {
                            keys.push(nested);
                        }
                    }
                }
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

/// Compute the Levenshtein edit distance between two strings.
fn levenshtein(a: &str, b: &str) -> usize {
    let b_chars: Vec<char> = b.chars().collect();
    let b_len = b_chars.len();
    if a.is_empty() {
        return b_len;
    }
    if b_len == 0 {
        return a.chars().count();
    }

    let mut prev: Vec<usize> = (0..=b_len).collect();
    let mut curr = vec![0; b_len + 1];

    for (i, ca) in a.chars().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b_chars.iter().enumerate() {
            let cost = usize::from(ca != *cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b_len]
}

/// Suggest the closest known key for an unknown key, if within edit distance 3.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (k, levenshtein(unknown, k)))
        .filter(|&(_, dist)| dist <= 3)
        .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
        .map(|(k, _)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Parse a raw TOML string and return warnings for any unknown config keys.
///
/// This does NOT fail on unknown keys, it only warns.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(), // parse errors are handled by serde later
    };

    let known = known_config_keys();
    walk_toml_keys(&value, "")
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Physical Range Validation
// ============================================================================

/// Validate physical ranges on a parsed BenchConfig.
///
/// Returns (errors, warnings): errors are impossible values that must
/// prevent startup; warnings are suspicious but not fatal.
pub fn validate_physical_ranges(
    config: &super::BenchConfig,
) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let d = &config.device;
    let c = &config.channels;

    if d.voltage_range_min >= d.voltage_range_max {
        errors.push(format!(
            "device.voltage_range_min ({:.2}) must be below voltage_range_max ({:.2})",
            d.voltage_range_min, d.voltage_range_max
        ));
    }

    // A threshold the DAQ can never read means the channel never turns ON
    if c.on_threshold_v <= d.voltage_range_min || c.on_threshold_v > d.voltage_range_max {
        errors.push(format!(
            "channels.on_threshold_v = {:.2} is outside the DAQ range ({:.1}-{:.1} V)",
            c.on_threshold_v, d.voltage_range_min, d.voltage_range_max
        ));
    }

    // Out-of-range limits inside the DAQ range would flag healthy readings
    if c.out_of_range_high_v < d.voltage_range_max {
        warnings.push(ValidationWarning {
            field: "channels.out_of_range_high_v".to_string(),
            message: format!(
                "out_of_range_high_v = {:.2} is below the DAQ maximum ({:.1} V); normal ON levels will warn",
                c.out_of_range_high_v, d.voltage_range_max
            ),
            suggestion: None,
        });
    }
    if c.out_of_range_low_v > d.voltage_range_min {
        warnings.push(ValidationWarning {
            field: "channels.out_of_range_low_v".to_string(),
            message: format!(
                "out_of_range_low_v = {:.2} is above the DAQ minimum ({:.1} V); normal OFF levels will warn",
                c.out_of_range_low_v, d.voltage_range_min
            ),
            suggestion: None,
        });
    }

    for ch in Channel::ALL {
        let line = config.channels.lines.line(ch);
        if !line.is_empty() && !line.starts_with("ai") {
            warnings.push(ValidationWarning {
                field: format!("channels.lines.{}", ch.config_key()),
                message: format!("channels.lines.{} = '{line}' is not an analog input line", ch.config_key()),
                suggestion: None,
            });
        }
    }

    let tol = config.pass_fail.tolerance_percent;
    if tol > 50.0 {
        warnings.push(ValidationWarning {
            field: "pass_fail.tolerance_percent".to_string(),
            message: format!("tolerance_percent = {tol:.1} makes almost every run pass"),
            suggestion: None,
        });
    }

    let rate = d.sampling_rate_hz;
    if rate > 1000.0 {
        warnings.push(ValidationWarning {
            field: "device.sampling_rate_hz".to_string(),
            message: format!("sampling_rate_hz = {rate:.1} is far above what the bench loop sustains"),
            suggestion: None,
        });
    }

    for s in &config.defrost.sectors {
        if !(0.0..=100.0).contains(&s.power) {
            errors.push(format!(
                "defrost sector '{}' power = {:.1} must be within 0-100%",
                s.name, s.power
            ));
        }
        if s.on_secs < 0.0 || s.off_secs < 0.0 {
            errors.push(format!(
                "defrost sector '{}' on/off seconds cannot be negative",
                s.name
            ));
        } else if (s.on_secs + s.off_secs - s.period_secs).abs() > 1e-6 {
            warnings.push(ValidationWarning {
                field: "defrost.sectors".to_string(),
                message: format!(
                    "defrost sector '{}' on_secs + off_secs ({:.1}) differs from period_secs ({:.1})",
                    s.name,
                    s.on_secs + s.off_secs,
                    s.period_secs
                ),
                suggestion: None,
            });
        }
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BenchConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("hello", "hello"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("tolerence", "tolerance"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [channels]
            [channels.lines]
            door = "ai0"
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"channels".to_string()));
        assert!(keys.contains(&"channels.lines".to_string()));
        assert!(keys.contains(&"channels.lines.door".to_string()));
    }

    #[test]
    fn test_walk_toml_keys_array_of_tables() {
        let toml: toml::Value = r#"
            [[defrost.sectors]]
            name = "A"
            power = 30.0

            [[defrost.sectors]]
            name = "B"
            power = 20.0
        "#
        .parse()
        .unwrap();
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"defrost.sectors.name".to_string()));
        assert_eq!(
            keys.iter().filter(|k| *k == "defrost.sectors.power").count(),
            1
        );
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[pass_fail]
tolerence_percent = 5.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].field.contains("tolerence_percent"));
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("pass_fail.tolerance_percent")
        );
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[device]
name = "cDAQ2Mod1"

[channels.lines]
door = "ai0"

[warnings]
overlap_policy = "once"

[[defrost.sectors]]
name = "Only"
percentage = 1.0
power = 30.0
on_secs = 9.0
off_secs = 21.0
period_secs = 30.0
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {warnings:?}");
    }

    #[test]
    fn test_unknown_section_produces_warning() {
        let warnings = validate_unknown_keys("[spectrum]\nband = 3\n");
        assert!(warnings.iter().any(|w| w.field == "spectrum"));
    }

    #[test]
    fn test_suggest_correction_no_match_for_garbage() {
        let known = known_config_keys();
        assert!(suggest_correction("completely_unrelated_garbage_key_xyz", &known).is_none());
    }

    #[test]
    fn test_known_keys_covers_all_sections() {
        let known = known_config_keys();
        for section in [
            "device",
            "channels",
            "power",
            "warnings",
            "pass_fail",
            "defrost",
            "state_machine",
            "interaction",
            "storage",
        ] {
            assert!(known.contains(section), "missing section {section}");
        }
        for ch in Channel::ALL {
            let key = format!("channels.lines.{}", ch.config_key());
            assert!(known.contains(key.as_str()), "missing {key}");
        }
    }

    #[test]
    fn test_physical_range_defaults_clean() {
        let config = BenchConfig::default();
        let (errors, warnings) = validate_physical_ranges(&config);
        assert!(errors.is_empty(), "Defaults should produce no errors: {errors:?}");
        assert!(warnings.is_empty(), "Defaults should produce no warnings: {warnings:?}");
    }

    #[test]
    fn test_on_threshold_outside_daq_range() {
        let mut config = BenchConfig::default();
        config.channels.on_threshold_v = 7.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("on_threshold_v")));
    }

    #[test]
    fn test_sector_power_over_100() {
        let mut config = BenchConfig::default();
        config.defrost.sectors[1].power = 140.0;
        let (errors, _) = validate_physical_ranges(&config);
        assert!(errors.iter().any(|e| e.contains("Sector 2")));
    }

    #[test]
    fn test_loose_tolerance_warns() {
        let mut config = BenchConfig::default();
        config.pass_fail.tolerance_percent = 80.0;
        let (_, warnings) = validate_physical_ranges(&config);
        assert!(warnings.iter().any(|w| w.field == "pass_fail.tolerance_percent"));
    }
}
