//! Signal Classifier - raw voltage to logical channel state
//!
//! Channel handling is table-driven: every channel has one
//! [`ClassificationRule`] in the [`ChannelPolicy`], so nothing downstream
//! branches on channel identity to decide polarity.

use serde::{Deserialize, Serialize};

use crate::config::ChannelConfig;
use crate::types::{Channel, SignalState};

/// How a channel's voltage maps to a [`SignalState`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "rule", rename_all = "snake_case")]
pub enum ClassificationRule {
    /// ON at or above `on_threshold`, OFF below.
    ActiveHigh { on_threshold: f64 },
    /// Inverted door switch: CLOSED below `closed_below`, OPEN within
    /// `[open_min, open_max]`, UNKNOWN anywhere else.
    InvertedBand {
        closed_below: f64,
        open_min: f64,
        open_max: f64,
    },
}

impl ClassificationRule {
    pub fn classify(self, voltage: f64) -> SignalState {
        if !voltage.is_finite() {
            return SignalState::Unknown;
        }
        match self {
            Self::ActiveHigh { on_threshold } => {
                if voltage >= on_threshold {
                    SignalState::On
                } else {
                    SignalState::Off
                }
            }
            Self::InvertedBand {
                closed_below,
                open_min,
                open_max,
            } => {
                if voltage < closed_below {
                    SignalState::Closed
                } else if (open_min..=open_max).contains(&voltage) {
                    SignalState::Open
                } else {
                    SignalState::Unknown
                }
            }
        }
    }
}

/// Per-channel classification table plus the shared signal limits.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPolicy {
    rules: [ClassificationRule; 5],
    on_threshold: f64,
    out_of_range_high: f64,
    out_of_range_low: f64,
}

impl ChannelPolicy {
    pub fn from_config(config: &ChannelConfig) -> Self {
        let active_high = ClassificationRule::ActiveHigh {
            on_threshold: config.on_threshold_v,
        };
        let mut rules = [active_high; 5];
        rules[Channel::Door.index()] = ClassificationRule::InvertedBand {
            closed_below: config.door_closed_below_v,
            open_min: config.door_open_min_v,
            open_max: config.door_open_max_v,
        };
        Self {
            rules,
            on_threshold: config.on_threshold_v,
            out_of_range_high: config.out_of_range_high_v,
            out_of_range_low: config.out_of_range_low_v,
        }
    }

    pub fn rule(&self, channel: Channel) -> ClassificationRule {
        self.rules[channel.index()]
    }

    /// Classify one reading. Pure function of the table.
    pub fn classify(&self, channel: Channel, voltage: f64) -> SignalState {
        self.rule(channel).classify(voltage)
    }

    /// Classify a possibly missing reading; missing maps to UNKNOWN.
    pub fn classify_reading(&self, channel: Channel, voltage: Option<f64>) -> SignalState {
        voltage.map_or(SignalState::Unknown, |v| self.classify(channel, v))
    }

    /// Raw electrical ON test shared by power% and edge detection.
    ///
    /// For the door this means "open" (high voltage).
    pub fn is_high(&self, voltage: f64) -> bool {
        voltage >= self.on_threshold
    }

    pub fn is_out_of_range(&self, voltage: f64) -> bool {
        voltage > self.out_of_range_high || voltage < self.out_of_range_low
    }

    pub fn on_threshold(&self) -> f64 {
        self.on_threshold
    }
}

impl Default for ChannelPolicy {
    fn default() -> Self {
        Self::from_config(&ChannelConfig::default())
    }
}
