//! Shared data structures for the microwave QC bench
//!
//! - Channel identity and classified signal states
//! - Samples and elapsed-time breakdown
//! - Test-mode catalog and power expectations
//! - Oven run state and interaction signals
//! - Defrost schedule
//! - Warnings and test outcome types

mod channel;
mod defrost;
mod mode;
mod report;
mod sample;
mod state;
mod warning;

pub use channel::*;
pub use defrost::*;
pub use mode::*;
pub use report::*;
pub use sample::*;
pub use state::*;
pub use warning::*;
