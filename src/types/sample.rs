//! Recorded samples and the elapsed-time breakdown used by exports

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Channel, Voltages};

/// One observation of every channel at a sampling tick.
///
/// Created by the engine when a reading is ingested; never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Sample {
    /// Wall-clock time the reading was taken
    pub timestamp: DateTime<Utc>,
    /// Seconds since recording started
    pub elapsed_secs: f64,
    /// Raw voltage per channel
    pub voltages: Voltages,
}

impl Sample {
    pub fn voltage(&self, channel: Channel) -> Option<f64> {
        self.voltages.get(&channel).copied()
    }
}

/// One raw reading as delivered by an acquisition source.
///
/// `elapsed_secs` is optional: replayed or piped data carries its own
/// timeline, live sources leave it to the engine to derive from the
/// timestamp. JSON form:
/// `{"elapsed_secs": 1.0, "voltages": {"door": 0.1, "microwave": 4.9}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reading {
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub elapsed_secs: Option<f64>,
    pub voltages: Voltages,
}

impl Reading {
    /// Reading stamped with the current time.
    pub fn now(voltages: Voltages) -> Self {
        Self {
            timestamp: Utc::now(),
            elapsed_secs: None,
            voltages,
        }
    }

    pub fn at_elapsed(elapsed_secs: f64, voltages: Voltages) -> Self {
        Self {
            timestamp: Utc::now(),
            elapsed_secs: Some(elapsed_secs),
            voltages,
        }
    }
}

/// Elapsed time split into the H / Min / Sec / ms export columns.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ElapsedParts {
    pub hours: u64,
    pub minutes: u64,
    pub seconds: u64,
    pub millis: u64,
}

impl ElapsedParts {
    /// Truncating breakdown; negative or non-finite input maps to zero.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_secs(elapsed: f64) -> Self {
        if !elapsed.is_finite() || elapsed <= 0.0 {
            return Self::default();
        }
        Self {
            hours: (elapsed / 3600.0).floor() as u64,
            minutes: ((elapsed % 3600.0) / 60.0).floor() as u64,
            seconds: (elapsed % 60.0).floor() as u64,
            millis: ((elapsed % 1.0) * 1000.0).floor() as u64,
        }
    }
}

impl std::fmt::Display for ElapsedParts {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02}.{:03}",
            self.hours, self.minutes, self.seconds, self.millis
        )
    }
}
