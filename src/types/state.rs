//! Core state types: RunState, InteractionSignals, RecordingStatus

use serde::{Deserialize, Serialize};

// ============================================================================
// Oven Run State
// ============================================================================

/// Operating state of the oven under test, as inferred from its signals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    #[default]
    Idle,
    Run,
    Pause,
    Sleep,
    Locked,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "IDLE"),
            Self::Run => write!(f, "RUN"),
            Self::Pause => write!(f, "PAUSE"),
            Self::Sleep => write!(f, "SLEEP"),
            Self::Locked => write!(f, "LOCKED"),
        }
    }
}

/// Logical operator interactions derived from one sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct InteractionSignals {
    pub door_open: bool,
    pub start_pressed: bool,
    pub cancel_pressed: bool,
    pub knob_turned: bool,
    pub lock_combo: bool,
    pub unlock_combo: bool,
}

impl InteractionSignals {
    /// Any signal that counts as user activity for the sleep timer.
    pub const fn any_interaction(&self) -> bool {
        self.start_pressed || self.cancel_pressed || self.knob_turned || self.door_open
    }
}

// ============================================================================
// Recording Status
// ============================================================================

/// Lifecycle of a recording run inside the engine.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    /// Engine constructed, no run started
    #[default]
    Ready,
    /// Accepting samples
    Recording,
    /// Run ended normally
    Stopped,
    /// Acquisition fault; the run must be restarted
    Faulted,
}

impl RecordingStatus {
    pub const fn is_recording(self) -> bool {
        matches!(self, Self::Recording)
    }
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "Ready"),
            Self::Recording => write!(f, "Recording"),
            Self::Stopped => write!(f, "Stopped"),
            Self::Faulted => write!(f, "Faulted"),
        }
    }
}
