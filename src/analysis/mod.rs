//! Signal analysis components
//!
//! Leaves of the per-tick pipeline, each usable on its own:
//!
//! - `classifier`: raw voltage → [`SignalState`](crate::types::SignalState) via a per-channel policy table
//! - `power`: duty-cycle power% over a trailing window, live and retrospective
//! - `warnings`: out-of-range, door-open edges, MW + Grill overlap
//! - `defrost`: weight → sector schedule
//! - `pass_fail`: measured power against the mode's expectation
//! - `run_state`: IDLE / RUN / PAUSE / SLEEP / LOCKED machine
//! - `idle`: time with both heating elements off
//!
//! The [`TestEngine`](crate::engine::TestEngine) owns one of each per run.

pub mod classifier;
pub mod defrost;
pub mod idle;
pub mod pass_fail;
pub mod power;
pub mod run_state;
pub mod warnings;

pub use classifier::{ChannelPolicy, ClassificationRule};
pub use defrost::{DefrostError, DefrostScheduler};
pub use idle::IdleTracker;
pub use pass_fail::evaluate;
pub use power::{ExportWindowing, PowerAggregator, PowerReading};
pub use run_state::RunStateMachine;
pub use warnings::{OverlapPolicy, WarningDetector};
