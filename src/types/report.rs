//! Test outcome types: pass/fail verdicts, run statistics, export rows, reports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DefrostSchedule, ElapsedParts, Expectation, TestMode};

// ============================================================================
// Verdicts
// ============================================================================

/// Overall outcome of a test run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Verdict {
    Pass,
    Fail,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
        }
    }
}

/// Outcome of one checked metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricVerdict {
    Pass,
    Fail,
    #[serde(rename = "N/A")]
    NotApplicable,
}

impl std::fmt::Display for MetricVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Fail => write!(f, "FAIL"),
            Self::NotApplicable => write!(f, "N/A"),
        }
    }
}

/// Pass/fail evaluation of a finished run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PassFailResult {
    pub overall: Verdict,
    pub microwave: MetricVerdict,
    pub grill: MetricVerdict,
    pub microwave_measured: f64,
    pub grill_measured: f64,
    pub microwave_expected: Expectation,
    pub grill_expected: Expectation,
    /// Symmetric band in percentage points
    pub tolerance_percent: f64,
    /// Number of metrics that had a fixed expectation
    pub checked_metrics: usize,
    pub door_opens: u32,
    /// Human-readable line per checked metric, plus informational notes
    pub details: Vec<String>,
}

// ============================================================================
// Statistics
// ============================================================================

/// Running statistics of a recording.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct RunStatistics {
    /// Elapsed seconds of the latest sample
    pub duration_secs: f64,
    /// Samples ingested since start (not capped by history capacity)
    pub sample_count: u64,
    pub door_opens: u32,
    /// Live trailing-window microwave power (%)
    pub microwave_power: f64,
    /// Live trailing-window grill power (%)
    pub grill_power: f64,
    pub microwave_window: usize,
    pub grill_window: usize,
    /// Seconds during which neither microwave nor grill was on
    pub idle_secs: f64,
}

impl RunStatistics {
    /// `HH:MM:SS` duration label.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn duration_label(&self) -> String {
        let secs = self.duration_secs.max(0.0).trunc() as u64;
        format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ============================================================================
// Export
// ============================================================================

/// One exported data row per recorded sample.
///
/// Voltages are rounded to 3 decimals, powers to 1 decimal. A channel that
/// was missing from the sample exports as `None` (empty cell).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ExportRow {
    pub elapsed: ElapsedParts,
    pub microwave: Option<f64>,
    pub lamp: Option<f64>,
    pub door: Option<f64>,
    pub buzzer: Option<f64>,
    pub grill: Option<f64>,
    pub microwave_power: f64,
    pub grill_power: f64,
}

impl ExportRow {
    /// Header in column order.
    pub const COLUMNS: [&'static str; 11] = [
        "H",
        "Min",
        "Sec",
        "ms",
        "Microwave",
        "Lamp",
        "Door_SW",
        "Buzzer",
        "Grill",
        "MW_Power%",
        "Grill_Power%",
    ];
}

// ============================================================================
// Test Report
// ============================================================================

/// Everything known about a finished run; what gets exported and stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub mode: TestMode,
    /// Operator-entered weight (g or ml), when the mode takes one
    pub weight: Option<f64>,
    pub statistics: RunStatistics,
    pub result: PassFailResult,
    pub defrost: Option<DefrostSchedule>,
    /// Set when the run ended on an acquisition fault
    pub fault: Option<String>,
}

impl TestReport {
    /// One-line summary for logs and history listings.
    pub fn summary_line(&self) -> String {
        format!(
            "{} | {} | {} | {} samples | MW {:.1}% | Grill {:.1}% | {}",
            self.started_at.format("%Y-%m-%d %H:%M:%S"),
            self.mode.short_code(),
            self.statistics.duration_label(),
            self.statistics.sample_count,
            self.statistics.microwave_power,
            self.statistics.grill_power,
            self.result.overall,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_label_formats_hours() {
        let stats = RunStatistics {
            duration_secs: 3725.9,
            ..Default::default()
        };
        assert_eq!(stats.duration_label(), "01:02:05");
    }

    #[test]
    fn metric_verdict_serializes_na() {
        let json = serde_json::to_string(&MetricVerdict::NotApplicable).unwrap();
        assert_eq!(json, "\"N/A\"");
    }
}
