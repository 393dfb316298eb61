//! Oven QC: microwave oven quality-control test bench
//!
//! Samples the oven's door switch, lamp, microwave relay, grill relay and
//! buzzer lines, classifies every reading, and evaluates a test run against
//! the power expectation of the selected test mode.
//!
//! ## Architecture
//!
//! - **Acquisition**: sample sources (simulated oven, stdin JSON, CSV replay)
//! - **Analysis**: classification, duty-cycle power, warnings, run state,
//!   defrost schedule, pass/fail
//! - **Engine**: one recording run, processed synchronously per tick
//! - **Pipeline**: async recording session with pacing and cancellation
//! - **Export / Storage**: CSV + JSON output, sled-backed report history

pub mod acquisition;
pub mod analysis;
pub mod config;
pub mod engine;
pub mod export;
pub mod pipeline;
pub mod storage;
pub mod types;

pub use config::BenchConfig;
pub use engine::{EngineError, TestEngine, TickReport};
pub use pipeline::{RecordingSession, SessionOutcome};
pub use storage::{ReportStore, StorageError};
pub use types::{
    BenchWarning, Channel, DefrostSchedule, RunState, SignalState, TestMode, TestReport, Verdict,
};
