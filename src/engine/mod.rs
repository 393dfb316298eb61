//! Test Engine - one recording run of the QC bench
//!
//! Owns the sample history, the warning detector, the run-state machine,
//! the defrost schedule and the expectation for the selected test mode.
//! A fresh engine state is set up by [`TestEngine::start`]; every sample
//! is processed synchronously inside [`TestEngine::ingest`].
//!
//! ```text
//! Reading ─► classify ─┬─► WarningDetector ─► door/overlap/out-of-range warnings
//!                      ├─► history ─► PowerAggregator (live power%)
//!                      ├─► InteractionSignals ─► RunStateMachine
//!                      └─► DefrostSchedule (current sector, informational)
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::analysis::{
    self, ChannelPolicy, DefrostError, DefrostScheduler, ExportWindowing, IdleTracker,
    PowerAggregator, PowerReading, RunStateMachine, WarningDetector,
};
use crate::config::{BenchConfig, InteractionConfig, WarningConfig};
use crate::types::{
    BenchWarning, Channel, DefrostSchedule, ElapsedParts, ExportRow, InteractionSignals,
    PassFailResult, Reading, RecordingStatus, RunState, RunStatistics, Sample, Sector,
    SignalState, TestExpectation, TestMode, TestReport,
};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("no recording in progress (status: {0})")]
    NotRecording(RecordingStatus),

    #[error("no test has been started")]
    NotStarted,

    #[error("{mode} requires a weight ({min}-{max} {unit})")]
    MissingWeight {
        mode: TestMode,
        min: f64,
        max: f64,
        unit: &'static str,
    },

    #[error("weight {weight} {unit} is outside the range for {mode} ({min}-{max} {unit})")]
    WeightOutOfRange {
        mode: TestMode,
        weight: f64,
        min: f64,
        max: f64,
        unit: &'static str,
    },

    #[error(transparent)]
    Defrost(#[from] DefrostError),
}

/// Everything the presentation layer needs after one sample.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TickReport {
    pub elapsed_secs: f64,
    pub statuses: BTreeMap<Channel, SignalState>,
    pub microwave_power: PowerReading,
    pub grill_power: PowerReading,
    pub warnings: Vec<BenchWarning>,
    pub run_state: RunState,
    /// Active defrost sector, if a defrost schedule is running
    pub defrost_sector: Option<Sector>,
    /// Expected microwave state under the active sector's square wave
    pub defrost_expected_on: Option<bool>,
}

pub struct TestEngine {
    policy: ChannelPolicy,
    aggregator: PowerAggregator,
    detector: WarningDetector,
    warning_config: WarningConfig,
    state_machine: RunStateMachine,
    sleep_timeout: Duration,
    scheduler: DefrostScheduler,
    idle: IdleTracker,
    interaction: InteractionConfig,
    export_windowing: ExportWindowing,
    tolerance_percent: f64,

    history: VecDeque<Sample>,
    history_capacity: usize,
    sample_count: u64,
    last_elapsed: f64,

    status: RecordingStatus,
    mode: Option<TestMode>,
    weight: Option<f64>,
    expectation: TestExpectation,
    defrost: Option<DefrostSchedule>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    fault: Option<String>,
}

impl TestEngine {
    pub fn new(config: &BenchConfig) -> Self {
        let policy = ChannelPolicy::from_config(&config.channels);
        let sleep_timeout = Duration::from_secs(config.state_machine.sleep_timeout_secs);
        Self {
            aggregator: PowerAggregator::new(config.power.window_samples, policy.on_threshold()),
            detector: WarningDetector::new(policy.clone(), &config.warnings),
            warning_config: config.warnings,
            policy,
            state_machine: RunStateMachine::new(sleep_timeout),
            sleep_timeout,
            scheduler: DefrostScheduler::new(config.defrost.clone()),
            idle: IdleTracker::new(),
            interaction: config.interaction,
            export_windowing: config.power.export_windowing,
            tolerance_percent: config.pass_fail.tolerance_percent,
            history: VecDeque::with_capacity(config.power.history_capacity.min(4096)),
            history_capacity: config.power.history_capacity.max(1),
            sample_count: 0,
            last_elapsed: 0.0,
            status: RecordingStatus::Ready,
            mode: None,
            weight: None,
            expectation: TestExpectation::default(),
            defrost: None,
            started_at: None,
            finished_at: None,
            fault: None,
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Begin a new run. Validates the weight against the mode before any
    /// state is touched, so a rejected start leaves the previous run intact.
    pub fn start(
        &mut self,
        mode: TestMode,
        weight: Option<f64>,
        at: DateTime<Utc>,
    ) -> Result<(), EngineError> {
        let weight = match mode.weight_range() {
            Some(range) => {
                let w = weight.ok_or(EngineError::MissingWeight {
                    mode,
                    min: range.min,
                    max: range.max,
                    unit: range.unit,
                })?;
                if mode != TestMode::Defrost && !range.contains(w) {
                    return Err(EngineError::WeightOutOfRange {
                        mode,
                        weight: w,
                        min: range.min,
                        max: range.max,
                        unit: range.unit,
                    });
                }
                Some(w)
            }
            None => {
                if weight.is_some() {
                    warn!(mode = %mode, "Mode takes no weight; ignoring it");
                }
                None
            }
        };

        let defrost = match (mode, weight) {
            (TestMode::Defrost, Some(w)) => Some(self.scheduler.schedule(w)?),
            _ => None,
        };

        self.history.clear();
        self.sample_count = 0;
        self.last_elapsed = 0.0;
        self.detector = WarningDetector::new(self.policy.clone(), &self.warning_config)
            .with_forbidden_overlap(mode.forbids_overlap());
        self.state_machine = RunStateMachine::new(self.sleep_timeout);
        self.idle.reset();
        self.mode = Some(mode);
        self.weight = weight;
        self.expectation = mode.expectation();
        self.started_at = Some(at);
        self.finished_at = None;
        self.fault = None;
        self.status = RecordingStatus::Recording;

        self.defrost = defrost;
        if let Some(schedule) = &self.defrost {
            info!(
                weight_g = schedule.weight_grams,
                total = %schedule.total_time_label(),
                "Defrost schedule computed"
            );
        }
        info!(mode = %mode, weight = ?weight, "▶️  Recording started");
        Ok(())
    }

    /// End the run normally.
    pub fn stop(&mut self, at: DateTime<Utc>) {
        if self.status.is_recording() {
            self.status = RecordingStatus::Stopped;
            self.finished_at = Some(at);
            info!(samples = self.sample_count, "⏹️  Recording stopped");
        }
    }

    /// Acquisition failed: the run is over and must be restarted.
    pub fn mark_faulted(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        warn!(reason = %reason, "Acquisition fault, recording halted");
        self.status = RecordingStatus::Faulted;
        self.finished_at = Some(Utc::now());
        self.fault = Some(reason);
    }

    // ========================================================================
    // Per-Tick Processing
    // ========================================================================

    /// Process one reading: record it, run the detectors, update the oven
    /// state and report what the display needs.
    pub fn ingest(&mut self, reading: Reading) -> Result<TickReport, EngineError> {
        if !self.status.is_recording() {
            return Err(EngineError::NotRecording(self.status));
        }
        let started_at = self.started_at.ok_or(EngineError::NotStarted)?;

        #[allow(clippy::cast_precision_loss)]
        let elapsed_secs = reading.elapsed_secs.unwrap_or_else(|| {
            (reading.timestamp - started_at).num_milliseconds().max(0) as f64 / 1000.0
        });
        let sample = Sample {
            timestamp: reading.timestamp,
            elapsed_secs,
            voltages: reading.voltages,
        };

        let statuses: BTreeMap<Channel, SignalState> = Channel::ALL
            .into_iter()
            .map(|ch| (ch, self.policy.classify_reading(ch, sample.voltage(ch))))
            .collect();

        let warnings = self.detector.check(&sample);

        let heating = [Channel::Microwave, Channel::Grill]
            .iter()
            .any(|&ch| statuses.get(&ch) == Some(&SignalState::On));
        self.idle.record(elapsed_secs, heating);

        let signals = self.interaction_signals(&sample);
        let run_state = self.state_machine.update(&signals);

        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(sample);
        self.sample_count += 1;
        self.last_elapsed = elapsed_secs;

        let microwave_power = self.aggregator.power_percent(Channel::Microwave, &self.history);
        let grill_power = self.aggregator.power_percent(Channel::Grill, &self.history);

        let defrost_sector = self
            .defrost
            .as_ref()
            .and_then(|s| s.current_sector(elapsed_secs))
            .cloned();
        let defrost_expected_on = defrost_sector.as_ref().map(|s| s.expected_on_at(elapsed_secs));

        debug!(
            t = elapsed_secs,
            mw = microwave_power.percent,
            grill = grill_power.percent,
            state = %run_state,
            "tick"
        );

        Ok(TickReport {
            elapsed_secs,
            statuses,
            microwave_power,
            grill_power,
            warnings,
            run_state,
            defrost_sector,
            defrost_expected_on,
        })
    }

    fn interaction_signals(&self, sample: &Sample) -> InteractionSignals {
        let bound = |channel: Option<Channel>| {
            channel
                .and_then(|ch| sample.voltage(ch))
                .is_some_and(|v| v.is_finite() && self.policy.is_high(v))
        };
        InteractionSignals {
            door_open: self.detector.is_door_open(),
            start_pressed: bound(self.interaction.start),
            cancel_pressed: bound(self.interaction.cancel),
            knob_turned: bound(self.interaction.knob),
            lock_combo: bound(self.interaction.lock),
            unlock_combo: bound(self.interaction.unlock),
        }
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn status(&self) -> RecordingStatus {
        self.status
    }

    pub fn mode(&self) -> Option<TestMode> {
        self.mode
    }

    pub fn weight(&self) -> Option<f64> {
        self.weight
    }

    pub fn expectation(&self) -> TestExpectation {
        self.expectation
    }

    pub fn history(&self) -> &VecDeque<Sample> {
        &self.history
    }

    pub fn defrost_schedule(&self) -> Option<&DefrostSchedule> {
        self.defrost.as_ref()
    }

    pub fn run_state(&self) -> RunState {
        self.state_machine.state()
    }

    pub fn door_opens(&self) -> u32 {
        self.detector.door_opens()
    }

    pub fn fault(&self) -> Option<&str> {
        self.fault.as_deref()
    }

    pub fn live_power(&self, channel: Channel) -> PowerReading {
        self.aggregator.power_percent(channel, &self.history)
    }

    pub fn statistics(&self) -> RunStatistics {
        let mw = self.live_power(Channel::Microwave);
        let grill = self.live_power(Channel::Grill);
        RunStatistics {
            duration_secs: self.last_elapsed,
            sample_count: self.sample_count,
            door_opens: self.detector.door_opens(),
            microwave_power: mw.percent,
            grill_power: grill.percent,
            microwave_window: mw.samples_in_window,
            grill_window: grill.samples_in_window,
            idle_secs: self.idle.idle_secs(),
        }
    }

    /// Pass/fail on the live trailing-window powers.
    pub fn evaluate(&self) -> PassFailResult {
        let stats = self.statistics();
        analysis::evaluate(
            stats.microwave_power,
            stats.grill_power,
            self.expectation,
            stats.door_opens,
            self.tolerance_percent,
        )
    }

    /// One row per recorded sample, with retrospective power%.
    pub fn export_rows(&self) -> Vec<ExportRow> {
        let mw = self
            .aggregator
            .retrospective(Channel::Microwave, &self.history, self.export_windowing);
        let grill = self
            .aggregator
            .retrospective(Channel::Grill, &self.history, self.export_windowing);

        self.history
            .iter()
            .zip(mw.iter().zip(grill.iter()))
            .map(|(sample, (mw, grill))| {
                let volts = |ch: Channel| sample.voltage(ch).filter(|v| v.is_finite()).map(round3);
                ExportRow {
                    elapsed: ElapsedParts::from_secs(sample.elapsed_secs),
                    microwave: volts(Channel::Microwave),
                    lamp: volts(Channel::Lamp),
                    door: volts(Channel::Door),
                    buzzer: volts(Channel::Buzzer),
                    grill: volts(Channel::Grill),
                    microwave_power: round1(mw.percent),
                    grill_power: round1(grill.percent),
                }
            })
            .collect()
    }

    /// Snapshot of the run as a report (usable mid-run and after faults).
    pub fn report(&self) -> Result<TestReport, EngineError> {
        let (Some(started_at), Some(mode)) = (self.started_at, self.mode) else {
            return Err(EngineError::NotStarted);
        };
        Ok(TestReport {
            started_at,
            finished_at: self.finished_at.unwrap_or_else(Utc::now),
            mode,
            weight: self.weight,
            statistics: self.statistics(),
            result: self.evaluate(),
            defrost: self.defrost.clone(),
            fault: self.fault.clone(),
        })
    }
}

fn round3(v: f64) -> f64 {
    (v * 1000.0).round() / 1000.0
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Verdict;

    fn volts(door: f64, mw: f64, grill: f64, buzzer: f64) -> crate::types::Voltages {
        [
            (Channel::Door, door),
            (Channel::Lamp, 5.0),
            (Channel::Microwave, mw),
            (Channel::Grill, grill),
            (Channel::Buzzer, buzzer),
        ]
        .into_iter()
        .collect()
    }

    fn started(mode: TestMode, weight: Option<f64>) -> TestEngine {
        let mut engine = TestEngine::new(&BenchConfig::default());
        engine.start(mode, weight, Utc::now()).unwrap();
        engine
    }

    #[test]
    fn ingest_requires_recording() {
        let mut engine = TestEngine::new(&BenchConfig::default());
        let err = engine
            .ingest(Reading::at_elapsed(0.0, volts(0.0, 0.0, 0.0, 0.0)))
            .unwrap_err();
        assert!(matches!(err, EngineError::NotRecording(RecordingStatus::Ready)));
    }

    #[test]
    fn weight_is_validated_per_mode() {
        let mut engine = TestEngine::new(&BenchConfig::default());
        assert!(matches!(
            engine.start(TestMode::Popcorn, None, Utc::now()),
            Err(EngineError::MissingWeight { .. })
        ));
        assert!(matches!(
            engine.start(TestMode::Popcorn, Some(400.0), Utc::now()),
            Err(EngineError::WeightOutOfRange { .. })
        ));
        assert!(matches!(
            engine.start(TestMode::Defrost, Some(2001.0), Utc::now()),
            Err(EngineError::Defrost(DefrostError::InvalidWeight { .. }))
        ));
        assert_eq!(engine.status(), RecordingStatus::Ready);
        engine.start(TestMode::Defrost, Some(500.0), Utc::now()).unwrap();
        assert!(engine.defrost_schedule().is_some());
    }

    #[test]
    fn history_is_bounded() {
        let mut config = BenchConfig::default();
        config.power.window_samples = 5;
        config.power.history_capacity = 8;
        let mut engine = TestEngine::new(&config);
        engine.start(TestMode::Normal, None, Utc::now()).unwrap();
        for i in 0..20 {
            engine
                .ingest(Reading::at_elapsed(f64::from(i), volts(0.0, 0.0, 0.0, 0.0)))
                .unwrap();
        }
        assert_eq!(engine.history().len(), 8);
        assert_eq!(engine.history()[0].elapsed_secs, 12.0);
        assert_eq!(engine.statistics().sample_count, 20);
    }

    #[test]
    fn tick_reports_state_and_power() {
        let mut engine = started(TestMode::ManualMicrowave, None);
        let tick = engine
            .ingest(Reading::at_elapsed(0.0, volts(0.1, 5.0, 0.0, 5.0)))
            .unwrap();
        assert_eq!(tick.statuses[&Channel::Door], SignalState::Closed);
        assert_eq!(tick.statuses[&Channel::Microwave], SignalState::On);
        assert_eq!(tick.microwave_power.percent, 100.0);
        // Buzzer is bound to "start" by default
        assert_eq!(tick.run_state, RunState::Run);
        assert!(tick.warnings.is_empty());
    }

    #[test]
    fn door_open_pauses_oven() {
        let mut engine = started(TestMode::ManualMicrowave, None);
        engine.ingest(Reading::at_elapsed(0.0, volts(0.1, 5.0, 0.0, 5.0))).unwrap();
        let tick = engine
            .ingest(Reading::at_elapsed(1.0, volts(4.9, 0.0, 0.0, 0.0)))
            .unwrap();
        assert_eq!(tick.run_state, RunState::Pause);
        assert_eq!(tick.warnings, vec![BenchWarning::DoorOpened { count: 1 }]);
        assert_eq!(engine.door_opens(), 1);
    }

    #[test]
    fn dead_zone_door_keeps_oven_paused() {
        let mut engine = started(TestMode::ManualMicrowave, None);
        engine.ingest(Reading::at_elapsed(0.0, volts(0.1, 5.0, 0.0, 5.0))).unwrap();
        engine.ingest(Reading::at_elapsed(1.0, volts(4.9, 0.0, 0.0, 0.0))).unwrap();

        // Start pressed while the door reads in the dead zone
        let tick = engine
            .ingest(Reading::at_elapsed(2.0, volts(2.0, 0.0, 0.0, 5.0)))
            .unwrap();
        assert_eq!(tick.statuses[&Channel::Door], SignalState::Unknown);
        assert_eq!(tick.run_state, RunState::Pause);

        let tick = engine
            .ingest(Reading::at_elapsed(3.0, volts(4.9, 0.0, 0.0, 0.0)))
            .unwrap();
        assert!(tick.warnings.is_empty());
        assert_eq!(engine.door_opens(), 1);
    }

    #[test]
    fn forbidden_overlap_in_combination_mode() {
        let mut engine = started(TestMode::CombinationC1, None);
        let tick = engine
            .ingest(Reading::at_elapsed(0.0, volts(0.0, 5.0, 5.0, 0.0)))
            .unwrap();
        assert!(tick.warnings.contains(&BenchWarning::ForbiddenOverlap));
    }

    #[test]
    fn defrost_tick_reports_sector() {
        let mut engine = started(TestMode::Defrost, Some(1000.0));
        let tick = engine
            .ingest(Reading::at_elapsed(5.0, volts(0.0, 5.0, 0.0, 0.0)))
            .unwrap();
        let sector = tick.defrost_sector.unwrap();
        assert_eq!(sector.name, "Sector 1");
        assert_eq!(tick.defrost_expected_on, Some(true));
    }

    #[test]
    fn evaluate_and_report() {
        let mut engine = started(TestMode::Pasta, Some(200.0));
        for i in 0..10 {
            let mw = if i < 8 { 5.0 } else { 0.0 };
            engine
                .ingest(Reading::at_elapsed(f64::from(i), volts(0.0, mw, 0.0, 0.0)))
                .unwrap();
        }
        let result = engine.evaluate();
        assert_eq!(result.microwave_measured, 80.0);
        assert_eq!(result.overall, Verdict::Pass);

        engine.stop(Utc::now());
        let report = engine.report().unwrap();
        assert_eq!(report.mode, TestMode::Pasta);
        assert_eq!(report.statistics.sample_count, 10);
        assert_eq!(report.statistics.duration_secs, 9.0);
        assert!(report.fault.is_none());
    }

    #[test]
    fn export_rows_round_and_decompose() {
        let mut engine = started(TestMode::ManualMicrowave, None);
        engine
            .ingest(Reading::at_elapsed(3661.5, volts(0.12345, 4.98765, 0.0, 0.0)))
            .unwrap();
        let rows = engine.export_rows();
        assert_eq!(rows.len(), 1);
        let row = rows[0];
        assert_eq!(row.elapsed.hours, 1);
        assert_eq!(row.elapsed.minutes, 1);
        assert_eq!(row.elapsed.seconds, 1);
        assert_eq!(row.elapsed.millis, 500);
        assert_eq!(row.door, Some(0.123));
        assert_eq!(row.microwave, Some(4.988));
        assert_eq!(row.microwave_power, 100.0);
    }

    #[test]
    fn fault_halts_recording() {
        let mut engine = started(TestMode::Normal, None);
        engine.mark_faulted("device unplugged");
        assert_eq!(engine.status(), RecordingStatus::Faulted);
        assert!(engine
            .ingest(Reading::at_elapsed(0.0, volts(0.0, 0.0, 0.0, 0.0)))
            .is_err());
        assert_eq!(engine.report().unwrap().fault.as_deref(), Some("device unplugged"));
    }

    #[test]
    fn idle_time_tracked() {
        let mut engine = started(TestMode::Normal, None);
        for (t, mw) in [(0.0, 0.0), (1.0, 0.0), (2.0, 5.0), (3.0, 0.0)] {
            engine.ingest(Reading::at_elapsed(t, volts(0.0, mw, 0.0, 0.0))).unwrap();
        }
        assert_eq!(engine.statistics().idle_secs, 2.0);
    }
}
