//! Bench Configuration Module
//!
//! Per-station configuration loaded from TOML, replacing the hardcoded
//! thresholds and constants of the QC bench with operator-tunable values.
//!
//! ## Loading Order
//!
//! 1. `OVEN_QC_CONFIG` environment variable (path to TOML file)
//! 2. `bench_config.toml` in the current working directory
//! 3. Built-in defaults (the station's historical constants)
//!
//! ## Usage
//!
//! The config is loaded once in `main` and handed to the engine and the
//! recording session by reference; there is no global instance.
//!
//! ```ignore
//! let config = BenchConfig::load();
//! let engine = TestEngine::new(&config);
//! ```

mod bench_config;
pub mod defaults;
pub mod validation;

pub use bench_config::*;
