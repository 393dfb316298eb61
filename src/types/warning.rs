//! Per-tick warnings raised by the warning detector

use serde::{Deserialize, Serialize};

use super::Channel;

/// A non-fatal anomaly observed on one sample.
///
/// Recording always continues; warnings are collected in tick order and
/// their `Display` form is what operators see in the warning log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BenchWarning {
    /// Voltage outside the plausible signal range
    OutOfRange { channel: Channel, voltage: f64 },
    /// The acquisition source delivered no value for a channel
    MissingChannel { channel: Channel },
    /// Door voltage between the closed and open bands
    DoorIndeterminate { voltage: f64 },
    /// Door went from closed to open; `count` is the running total
    DoorOpened { count: u32 },
    /// Microwave and grill have both been on longer than the tolerance
    Overlap { duration_secs: f64 },
    /// Microwave and grill on together in a mode that alternates them
    ForbiddenOverlap,
}

impl BenchWarning {
    pub const fn is_overlap(&self) -> bool {
        matches!(self, Self::Overlap { .. })
    }
}

impl std::fmt::Display for BenchWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OutOfRange { channel, voltage } => {
                write!(f, "{channel} out of range: {voltage:.2}V")
            }
            Self::MissingChannel { channel } => write!(f, "{channel} reading missing"),
            Self::DoorIndeterminate { voltage } => {
                write!(f, "Door SW state unknown: {voltage:.2}V")
            }
            Self::DoorOpened { .. } => write!(f, "Door opened during test"),
            Self::Overlap { duration_secs } => {
                write!(f, "MW + Grill overlap detected: {duration_secs:.1}s")
            }
            Self::ForbiddenOverlap => {
                write!(f, "NO OVERLAP: MW and Grill should not run simultaneously!")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_use_bench_precision() {
        let w = BenchWarning::OutOfRange {
            channel: Channel::Grill,
            voltage: 5.678,
        };
        assert_eq!(w.to_string(), "Grill out of range: 5.68V");

        let w = BenchWarning::Overlap { duration_secs: 3.04 };
        assert_eq!(w.to_string(), "MW + Grill overlap detected: 3.0s");
    }
}
