//! Sample acquisition
//!
//! Every way readings can reach the bench sits behind one trait:
//! [`SampleSource`]. The recording session polls it once per sampling tick
//! inside a `select!` with cancellation.
//!
//! - [`SimulatedOven`]: synthetic square-wave signals per test mode
//! - [`StdinSource`]: JSON readings, one per line
//! - [`CsvReplaySource`]: replays a previously exported run

use async_trait::async_trait;
use thiserror::Error;

use crate::types::Reading;

mod csv_replay;
mod simulated;
mod stdin_source;

pub use csv_replay::CsvReplaySource;
pub use simulated::{DoorEvent, SimulatedOven};
pub use stdin_source::StdinSource;

// ============================================================================
// Error Types
// ============================================================================

/// Terminal acquisition failure. The current run stops and must be
/// restarted; sources never retry internally.
#[derive(Error, Debug)]
pub enum AcquisitionError {
    #[error("Device connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Device read failed: {0}")]
    ReadFailed(String),

    #[error("Malformed input at line {line}: {reason}")]
    Malformed { line: usize, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ============================================================================
// Source Trait
// ============================================================================

/// Events produced by a sample source.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    /// One voltage per configured channel
    Reading(Reading),
    /// No more data (end of file / stdin closed / simulation finished)
    Eof,
}

/// Where readings come from.
///
/// Implementations handle their own parsing; pacing is done by the caller.
#[async_trait]
pub trait SampleSource: Send {
    /// Read the next reading.
    ///
    /// Returns `SourceEvent::Eof` when no more data is available and `Err`
    /// on a device fault.
    async fn next_reading(&mut self) -> Result<SourceEvent, AcquisitionError>;

    /// Human-readable name for logging (e.g. "simulated", "stdin", "CSV").
    fn source_name(&self) -> &str;
}
