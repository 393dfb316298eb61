//! Recording Pipeline
//!
//! ```text
//! SampleSource ──► RecordingSession ──► TestEngine::ingest (per tick)
//!                        │
//!                        └─► SessionOutcome { report, export rows, stats }
//! ```
//!
//! The session owns the pacing and cancellation; the engine stays
//! synchronous and knows nothing about where readings come from.

mod session;

pub use session::{EndReason, RecordingSession, SessionOutcome, SessionStats};
