//! Defrost Scheduler - weight-driven sector layout

use thiserror::Error;

use crate::config::DefrostConfig;
use crate::types::{DefrostSchedule, Sector};

#[derive(Debug, Error, PartialEq)]
pub enum DefrostError {
    #[error("invalid defrost weight {weight} g: must be between {min} and {max} g")]
    InvalidWeight { weight: f64, min: f64, max: f64 },
}

/// Builds [`DefrostSchedule`]s from the configured formula and sector table.
#[derive(Debug, Clone)]
pub struct DefrostScheduler {
    config: DefrostConfig,
}

impl DefrostScheduler {
    pub fn new(config: DefrostConfig) -> Self {
        Self { config }
    }

    /// Total defrost time for `weight_grams`, in minutes.
    pub fn total_minutes(&self, weight_grams: f64) -> f64 {
        self.config.constant_factor * (weight_grams / self.config.weight_step_grams)
    }

    /// Lay out the sectors for `weight_grams` (inclusive range check).
    ///
    /// Boundaries are a running sum of `total × percentage`; the last end is
    /// pinned to the total so rounding never leaves a gap at the tail.
    pub fn schedule(&self, weight_grams: f64) -> Result<DefrostSchedule, DefrostError> {
        let (min, max) = (self.config.min_weight_grams, self.config.max_weight_grams);
        if !weight_grams.is_finite() || weight_grams < min || weight_grams > max {
            return Err(DefrostError::InvalidWeight {
                weight: weight_grams,
                min,
                max,
            });
        }

        let total_minutes = self.total_minutes(weight_grams);
        let total_secs = total_minutes * 60.0;

        let last = self.config.sectors.len().saturating_sub(1);
        let mut start = 0.0;
        let sectors = self
            .config
            .sectors
            .iter()
            .enumerate()
            .map(|(i, s)| {
                let end = if i == last {
                    total_secs
                } else {
                    start + total_secs * s.percentage
                };
                let sector = Sector {
                    name: s.name.clone(),
                    start_secs: start,
                    end_secs: end,
                    duration_secs: end - start,
                    expected_power: s.power,
                    on_secs: s.on_secs,
                    off_secs: s.off_secs,
                    period_secs: s.period_secs,
                };
                start = end;
                sector
            })
            .collect();

        Ok(DefrostSchedule {
            weight_grams,
            total_minutes,
            total_secs,
            sectors,
        })
    }
}

impl Default for DefrostScheduler {
    fn default() -> Self {
        Self::new(DefrostConfig::default())
    }
}
