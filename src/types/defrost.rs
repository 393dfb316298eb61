//! Defrost schedule types

use serde::{Deserialize, Serialize};

/// One time-bounded phase of a defrost cycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sector {
    pub name: String,
    /// Offset from cycle start (seconds, inclusive)
    pub start_secs: f64,
    /// Offset from cycle start (seconds, exclusive)
    pub end_secs: f64,
    pub duration_secs: f64,
    /// Expected microwave power during this sector (%)
    pub expected_power: f64,
    pub on_secs: f64,
    pub off_secs: f64,
    pub period_secs: f64,
}

impl Sector {
    pub fn contains(&self, elapsed_secs: f64) -> bool {
        self.start_secs <= elapsed_secs && elapsed_secs < self.end_secs
    }

    /// Expected microwave state at `elapsed_secs` under the sector's
    /// square wave (ON for `on_secs` at the start of every period).
    pub fn expected_on_at(&self, elapsed_secs: f64) -> bool {
        if !self.contains(elapsed_secs) || self.period_secs <= 0.0 {
            return false;
        }
        (elapsed_secs - self.start_secs) % self.period_secs < self.on_secs
    }

    /// `M:SS - M:SS` range used in the test summary.
    pub fn time_range_label(&self) -> String {
        format!(
            "{} - {}",
            minutes_seconds(self.start_secs),
            minutes_seconds(self.end_secs)
        )
    }
}

/// Sector layout derived from an operator-entered weight.
///
/// Immutable once computed; queried per tick by elapsed time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DefrostSchedule {
    pub weight_grams: f64,
    pub total_minutes: f64,
    pub total_secs: f64,
    pub sectors: Vec<Sector>,
}

impl DefrostSchedule {
    /// First sector whose `[start, end)` contains `elapsed_secs`.
    pub fn current_sector(&self, elapsed_secs: f64) -> Option<&Sector> {
        self.sectors.iter().find(|s| s.contains(elapsed_secs))
    }

    /// Total cook time as `M:SS`, seconds truncated like the bench display.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn total_time_label(&self) -> String {
        let minutes = self.total_minutes.max(0.0);
        format!("{}:{:02}", minutes.trunc() as u64, (minutes.fract() * 60.0).trunc() as u64)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn minutes_seconds(secs: f64) -> String {
    let secs = secs.max(0.0);
    format!("{}:{:02}", (secs / 60.0).trunc() as u64, (secs % 60.0).trunc() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sector(start: f64, end: f64) -> Sector {
        Sector {
            name: "Sector 1".to_string(),
            start_secs: start,
            end_secs: end,
            duration_secs: end - start,
            expected_power: 36.7,
            on_secs: 11.0,
            off_secs: 19.0,
            period_secs: 30.0,
        }
    }

    #[test]
    fn square_wave_follows_period() {
        let s = sector(0.0, 120.0);
        assert!(s.expected_on_at(0.0));
        assert!(s.expected_on_at(10.9));
        assert!(!s.expected_on_at(11.0));
        assert!(!s.expected_on_at(29.9));
        assert!(s.expected_on_at(30.0));
        assert!(!s.expected_on_at(120.0));
    }

    #[test]
    fn range_label() {
        assert_eq!(sector(0.0, 125.0).time_range_label(), "0:00 - 2:05");
    }
}
