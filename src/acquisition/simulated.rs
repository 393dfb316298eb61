//! Simulated oven - synthetic relay signals for each test mode
//!
//! Produces the square waves a healthy oven would show on the bench lines:
//! microwave and grill duty cycles over a 30 s period, lamp on while
//! heating or with the door open, a buzzer beep at start and after each
//! door closing. Gaussian noise is added to every line.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::prelude::*;
use rand_distr::StandardNormal;

use super::{AcquisitionError, SampleSource, SourceEvent};
use crate::types::{Channel, DefrostSchedule, Reading, TestMode, Voltages};

/// Relay/lamp/buzzer ON level (V)
const HIGH_V: f64 = 4.95;
/// OFF level (V)
const LOW_V: f64 = 0.02;
/// Door switch level while open (V)
const DOOR_OPEN_V: f64 = 4.8;
/// Duty-cycle period of the oven's power control (s)
const CYCLE_SECS: f64 = 30.0;

/// The door is held open during `[open_at_secs, close_at_secs)`; the oven
/// stops heating meanwhile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DoorEvent {
    pub open_at_secs: f64,
    pub close_at_secs: f64,
}

impl DoorEvent {
    fn is_open(&self, t: f64) -> bool {
        self.open_at_secs <= t && t < self.close_at_secs
    }
}

pub struct SimulatedOven {
    mode: TestMode,
    defrost: Option<DefrostSchedule>,
    rng: StdRng,
    noise_std: f64,
    sample_period_secs: f64,
    duration_secs: Option<f64>,
    door_events: Vec<DoorEvent>,
    fault_after: Option<u64>,
    started_at: DateTime<Utc>,
    elapsed_secs: f64,
    emitted: u64,
}

impl SimulatedOven {
    pub fn new(mode: TestMode, sample_period_secs: f64, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self {
            mode,
            defrost: None,
            rng,
            noise_std: 0.02,
            sample_period_secs: sample_period_secs.max(1e-3),
            duration_secs: None,
            door_events: Vec::new(),
            fault_after: None,
            started_at: Utc::now(),
            elapsed_secs: 0.0,
            emitted: 0,
        }
    }

    /// Follow a defrost schedule's sector square waves.
    pub fn with_defrost(mut self, schedule: DefrostSchedule) -> Self {
        self.defrost = Some(schedule);
        self
    }

    /// End of data after this much simulated time.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn with_door_event(mut self, event: DoorEvent) -> Self {
        self.door_events.push(event);
        self
    }

    pub fn with_noise(mut self, std_dev: f64) -> Self {
        self.noise_std = std_dev.abs();
        self
    }

    /// Fail with a read error after `readings` successful readings.
    pub fn with_fault_after(mut self, readings: u64) -> Self {
        self.fault_after = Some(readings);
        self
    }

    pub fn mode(&self) -> TestMode {
        self.mode
    }

    /// Expected (microwave, grill) relay states at `t` for a healthy oven.
    pub fn heating_at(&self, t: f64) -> (bool, bool) {
        let phase = t.rem_euclid(CYCLE_SECS);
        let duty = |fraction: f64| phase < CYCLE_SECS * fraction;
        match self.mode {
            TestMode::ManualMicrowave => (duty(0.5), false),
            TestMode::ManualGrill => (false, true),
            TestMode::CombinationC1 => (duty(0.2), !duty(0.2)),
            TestMode::CombinationC2 => (duty(0.4), !duty(0.4)),
            TestMode::Chicken => (duty(0.53), !duty(0.53)),
            TestMode::Popcorn
            | TestMode::Meat
            | TestMode::Pizza
            | TestMode::Rice
            | TestMode::Beverages => (true, false),
            TestMode::Pasta => (duty(0.8), false),
            TestMode::Fish => (duty(0.77), false),
            TestMode::Defrost => {
                let on = self
                    .defrost
                    .as_ref()
                    .and_then(|s| s.current_sector(t))
                    .is_some_and(|sector| sector.expected_on_at(t));
                (on, false)
            }
            TestMode::Normal => (t.rem_euclid(60.0) < 10.0, false),
        }
    }

    /// Synthesize all five lines at `t`.
    pub fn voltages_at(&mut self, t: f64) -> Voltages {
        let door_open = self.door_events.iter().any(|e| e.is_open(t));
        let (mw, grill) = if door_open {
            (false, false)
        } else {
            self.heating_at(t)
        };
        let beep = t < self.sample_period_secs
            || self
                .door_events
                .iter()
                .any(|e| e.close_at_secs <= t && t < e.close_at_secs + self.sample_period_secs);

        let level = |on: bool| if on { HIGH_V } else { LOW_V };
        let mut voltages = Voltages::new();
        voltages.insert(Channel::Door, if door_open { DOOR_OPEN_V } else { LOW_V });
        voltages.insert(Channel::Lamp, level(mw || grill || door_open));
        voltages.insert(Channel::Microwave, level(mw));
        voltages.insert(Channel::Grill, level(grill));
        voltages.insert(Channel::Buzzer, level(beep));

        if self.noise_std > 0.0 {
            for v in voltages.values_mut() {
                let n: f64 = self.rng.sample(StandardNormal);
                *v += n * self.noise_std;
            }
        }
        voltages
    }

    /// Next reading on the simulated clock, `None` once the duration is reached.
    pub fn next_reading_sync(&mut self) -> Option<Reading> {
        if self.duration_secs.is_some_and(|d| self.elapsed_secs >= d) {
            return None;
        }
        let t = self.elapsed_secs;
        let voltages = self.voltages_at(t);
        #[allow(clippy::cast_possible_truncation)]
        let offset = chrono::Duration::milliseconds((t * 1000.0).round() as i64);
        let reading = Reading {
            timestamp: self.started_at + offset,
            elapsed_secs: Some(t),
            voltages,
        };
        self.emitted += 1;
        self.elapsed_secs += self.sample_period_secs;
        Some(reading)
    }
}

#[async_trait]
impl SampleSource for SimulatedOven {
    async fn next_reading(&mut self) -> Result<SourceEvent, AcquisitionError> {
        if self.fault_after.is_some_and(|n| self.emitted >= n) {
            return Err(AcquisitionError::ReadFailed(
                "simulated device disconnected".to_string(),
            ));
        }
        Ok(self
            .next_reading_sync()
            .map_or(SourceEvent::Eof, SourceEvent::Reading))
    }

    fn source_name(&self) -> &str {
        "simulated"
    }
}
