//! Channel identity and classified signal states

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ============================================================================
// Channel
// ============================================================================

/// One analog signal line of the bench, mapped to an oven component.
///
/// Serialized as snake_case (`door`, `microwave`, ...). The bench's
/// historical column names (`Door SW`, `Door_SW`, `Microwave`, ...) are
/// accepted as aliases so recorded files from the old station still load.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Door switch (inverted: 0 V = closed, 5 V = open)
    #[serde(alias = "Door SW", alias = "Door_SW", alias = "door_sw")]
    Door,
    /// Cavity lamp
    #[serde(alias = "Lamp")]
    Lamp,
    /// Microwave (magnetron) relay
    #[serde(alias = "Microwave", alias = "mw")]
    Microwave,
    /// Grill heater relay
    #[serde(alias = "Grill")]
    Grill,
    /// Buzzer
    #[serde(alias = "Buzzer")]
    Buzzer,
}

impl Channel {
    /// All channels in acquisition order.
    pub const ALL: [Self; 5] = [
        Self::Door,
        Self::Lamp,
        Self::Microwave,
        Self::Grill,
        Self::Buzzer,
    ];

    /// Channels whose duty cycle is reported as power%.
    pub const POWER: [Self; 2] = [Self::Microwave, Self::Grill];

    /// Get display name for logs and reports
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Door => "Door SW",
            Self::Lamp => "Lamp",
            Self::Microwave => "Microwave",
            Self::Grill => "Grill",
            Self::Buzzer => "Buzzer",
        }
    }

    /// Column header used in exported data files
    pub const fn export_column(self) -> &'static str {
        match self {
            Self::Door => "Door_SW",
            Self::Lamp => "Lamp",
            Self::Microwave => "Microwave",
            Self::Grill => "Grill",
            Self::Buzzer => "Buzzer",
        }
    }

    /// Config key under `[channels.lines]` and `[interaction]`
    pub const fn config_key(self) -> &'static str {
        match self {
            Self::Door => "door",
            Self::Lamp => "lamp",
            Self::Microwave => "microwave",
            Self::Grill => "grill",
            Self::Buzzer => "buzzer",
        }
    }

    /// Stable index into per-channel arrays
    pub const fn index(self) -> usize {
        match self {
            Self::Door => 0,
            Self::Lamp => 1,
            Self::Microwave => 2,
            Self::Grill => 3,
            Self::Buzzer => 4,
        }
    }

    pub const fn is_power_channel(self) -> bool {
        matches!(self, Self::Microwave | Self::Grill)
    }

    /// Parse from a config/CLI string (case-insensitive, accepts the column names).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "door" | "door sw" | "door_sw" => Some(Self::Door),
            "lamp" => Some(Self::Lamp),
            "microwave" | "mw" => Some(Self::Microwave),
            "grill" => Some(Self::Grill),
            "buzzer" => Some(Self::Buzzer),
            _ => None,
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

/// One voltage per channel, as delivered by an acquisition source.
pub type Voltages = BTreeMap<Channel, f64>;

// ============================================================================
// Signal State
// ============================================================================

/// Logical state of a channel after threshold classification.
///
/// `Closed`/`Open` are only produced for the door; `On`/`Off` for every other
/// channel. `Unknown` covers the door dead zone, non-finite readings and
/// channels missing from a sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalState {
    On,
    Off,
    Closed,
    Open,
    Unknown,
}

impl SignalState {
    /// Whether the channel is electrically active in its own polarity.
    ///
    /// For the door that means closed (0 V); for everything else ON.
    pub const fn is_active(self) -> bool {
        matches!(self, Self::On | Self::Closed)
    }
}

impl std::fmt::Display for SignalState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::On => write!(f, "ON"),
            Self::Off => write!(f, "OFF"),
            Self::Closed => write!(f, "CLOSED"),
            Self::Open => write!(f, "OPEN"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_follow_acquisition_order() {
        for (i, ch) in Channel::ALL.iter().enumerate() {
            assert_eq!(ch.index(), i);
        }
    }

    #[test]
    fn historical_column_names_deserialize() {
        let v: Voltages =
            serde_json::from_str(r#"{"Door SW": 0.1, "Microwave": 4.9, "grill": 0.0}"#).unwrap();
        assert_eq!(v.get(&Channel::Door), Some(&0.1));
        assert_eq!(v.get(&Channel::Microwave), Some(&4.9));
        assert_eq!(v.get(&Channel::Grill), Some(&0.0));
    }

    #[test]
    fn parse_accepts_aliases() {
        assert_eq!(Channel::parse("Door_SW"), Some(Channel::Door));
        assert_eq!(Channel::parse(" MW "), Some(Channel::Microwave));
        assert_eq!(Channel::parse("oven"), None);
    }
}
