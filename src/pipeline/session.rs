//! Recording session: drives one test run from a sample source.
//!
//! Paces reads at the configured sampling rate (scaled by `speed`), feeds
//! each reading through the [`TestEngine`] and stops on end of data,
//! cancellation, the optional duration limit or an acquisition fault.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::acquisition::{SampleSource, SourceEvent};
use crate::engine::{EngineError, TestEngine, TickReport};
use crate::types::{BenchWarning, ExportRow, TestReport};

/// Log a progress line every this many readings.
const PROGRESS_EVERY: u64 = 50;

/// Why a session ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    EndOfData,
    Cancelled,
    DurationReached,
    Fault,
}

impl std::fmt::Display for EndReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EndOfData => write!(f, "end of data"),
            Self::Cancelled => write!(f, "cancelled"),
            Self::DurationReached => write!(f, "duration reached"),
            Self::Fault => write!(f, "acquisition fault"),
        }
    }
}

/// Counters collected while the session runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SessionStats {
    pub readings: u64,
    pub warnings: u64,
    pub overlap_warnings: u64,
    pub out_of_range_warnings: u64,
    pub missing_channel_warnings: u64,
}

impl SessionStats {
    fn record(&mut self, warnings: &[BenchWarning]) {
        for w in warnings {
            self.warnings += 1;
            match w {
                BenchWarning::Overlap { .. } | BenchWarning::ForbiddenOverlap => {
                    self.overlap_warnings += 1;
                }
                BenchWarning::OutOfRange { .. } => self.out_of_range_warnings += 1,
                BenchWarning::MissingChannel { .. } => self.missing_channel_warnings += 1,
                _ => {}
            }
        }
    }
}

/// Everything a finished session hands back to the caller.
#[derive(Debug, Clone)]
pub struct SessionOutcome {
    pub report: TestReport,
    pub rows: Vec<ExportRow>,
    pub stats: SessionStats,
    pub end_reason: EndReason,
}

pub struct RecordingSession {
    engine: TestEngine,
    cancel_token: CancellationToken,
    sample_period: Duration,
    speed: f64,
    max_duration_secs: Option<f64>,
}

impl RecordingSession {
    /// `engine` must already be started.
    pub fn new(engine: TestEngine, sample_period: Duration, cancel_token: CancellationToken) -> Self {
        Self {
            engine,
            cancel_token,
            sample_period,
            speed: 1.0,
            max_duration_secs: None,
        }
    }

    /// Playback speed multiplier; 0 reads as fast as the source delivers.
    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = if speed.is_finite() { speed.max(0.0) } else { 0.0 };
        self
    }

    /// Stop once a reading's elapsed time reaches `secs`.
    pub fn with_max_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = Some(secs);
        self
    }

    pub fn engine(&self) -> &TestEngine {
        &self.engine
    }

    fn pacer(&self) -> Option<Interval> {
        if self.speed <= 0.0 || self.sample_period.is_zero() {
            return None;
        }
        let mut ticker = interval(self.sample_period.div_f64(self.speed));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Some(ticker)
    }

    /// Run until the source is exhausted, cancellation, the duration limit
    /// or a fault. The run is stopped (or faulted) on return.
    pub async fn run<S: SampleSource + ?Sized>(
        mut self,
        source: &mut S,
    ) -> Result<SessionOutcome, EngineError> {
        let mut stats = SessionStats::default();
        let mut pacer = self.pacer();
        let mut last_sector: Option<String> = None;

        info!("📊 Recording from {}...", source.source_name());
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

        let end_reason = loop {
            if let Some(ticker) = pacer.as_mut() {
                tokio::select! {
                    biased;
                    () = self.cancel_token.cancelled() => break EndReason::Cancelled,
                    _ = ticker.tick() => {}
                }
            }

            let event = tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    info!("[Session] Shutdown signal received");
                    break EndReason::Cancelled;
                }
                result = source.next_reading() => result,
            };

            let reading = match event {
                Ok(SourceEvent::Reading(r)) => r,
                Ok(SourceEvent::Eof) => {
                    info!("[Session] Source reached end ({} readings)", stats.readings);
                    break EndReason::EndOfData;
                }
                Err(e) => {
                    self.engine.mark_faulted(e.to_string());
                    break EndReason::Fault;
                }
            };

            let tick = self.engine.ingest(reading)?;
            stats.readings += 1;
            stats.record(&tick.warnings);
            log_tick(&tick, &mut last_sector);

            if stats.readings % PROGRESS_EVERY == 0 {
                info!(
                    "📈 {:.1}s | MW {:.1}% | Grill {:.1}% | {} | warnings: {}",
                    tick.elapsed_secs,
                    tick.microwave_power.percent,
                    tick.grill_power.percent,
                    tick.run_state,
                    stats.warnings
                );
            }

            if self
                .max_duration_secs
                .is_some_and(|max| tick.elapsed_secs >= max)
            {
                break EndReason::DurationReached;
            }
        };

        self.engine.stop(Utc::now());
        let report = self.engine.report()?;
        log_summary(&report, &stats, end_reason);

        Ok(SessionOutcome {
            rows: self.engine.export_rows(),
            report,
            stats,
            end_reason,
        })
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn log_tick(tick: &TickReport, last_sector: &mut Option<String>) {
    for w in &tick.warnings {
        warn!(t = tick.elapsed_secs, "⚠️  {}", w);
    }
    if let Some(sector) = &tick.defrost_sector {
        if last_sector.as_deref() != Some(sector.name.as_str()) {
            info!(
                "🧊 {} ({}) expected {:.1}%",
                sector.name,
                sector.time_range_label(),
                sector.expected_power
            );
            *last_sector = Some(sector.name.clone());
        }
    }
}

fn log_summary(report: &TestReport, stats: &SessionStats, end_reason: EndReason) {
    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("📊 TEST SUMMARY ({})", end_reason);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("   Mode:           {}", report.mode);
    info!("   Duration:       {}", report.statistics.duration_label());
    info!("   Samples:        {}", report.statistics.sample_count);
    info!("   MW Power:       {:.1}%", report.statistics.microwave_power);
    info!("   Grill Power:    {:.1}%", report.statistics.grill_power);
    info!("   Idle Time:      {:.1}s", report.statistics.idle_secs);
    info!("   Door Opens:     {}", report.statistics.door_opens);
    info!("   Warnings:       {}", stats.warnings);
    if let Some(schedule) = &report.defrost {
        info!("   Defrost Total:  {}", schedule.total_time_label());
    }
    for line in &report.result.details {
        info!("   {}", line);
    }
    if let Some(fault) = &report.fault {
        warn!("   Fault:          {}", fault);
    }
    info!("   Result:         {}", report.result.overall);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::SimulatedOven;
    use crate::config::BenchConfig;
    use crate::types::{RecordingStatus, TestMode, Verdict};

    fn started(mode: TestMode, weight: Option<f64>) -> TestEngine {
        let mut engine = TestEngine::new(&BenchConfig::default());
        engine.start(mode, weight, Utc::now()).unwrap();
        engine
    }

    #[tokio::test]
    async fn runs_to_end_of_data() {
        let mut oven = SimulatedOven::new(TestMode::Popcorn, 0.5, Some(11)).with_duration(60.0);
        let session = RecordingSession::new(
            started(TestMode::Popcorn, Some(100.0)),
            Duration::from_millis(500),
            CancellationToken::new(),
        )
        .with_speed(0.0);

        let outcome = session.run(&mut oven).await.unwrap();
        assert_eq!(outcome.end_reason, EndReason::EndOfData);
        assert_eq!(outcome.stats.readings, 120);
        assert_eq!(outcome.rows.len(), 120);
        assert_eq!(outcome.report.result.overall, Verdict::Pass);
    }

    #[tokio::test]
    async fn fault_ends_run() {
        let mut oven = SimulatedOven::new(TestMode::Normal, 1.0, Some(2)).with_fault_after(5);
        let session = RecordingSession::new(
            started(TestMode::Normal, None),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .with_speed(0.0);

        let outcome = session.run(&mut oven).await.unwrap();
        assert_eq!(outcome.end_reason, EndReason::Fault);
        assert_eq!(outcome.stats.readings, 5);
        assert!(outcome.report.fault.is_some());
    }

    #[tokio::test]
    async fn duration_limit_and_cancellation() {
        let mut oven = SimulatedOven::new(TestMode::Normal, 1.0, Some(2));
        let session = RecordingSession::new(
            started(TestMode::Normal, None),
            Duration::from_secs(1),
            CancellationToken::new(),
        )
        .with_speed(0.0)
        .with_max_duration(9.0);
        let outcome = session.run(&mut oven).await.unwrap();
        assert_eq!(outcome.end_reason, EndReason::DurationReached);
        assert_eq!(outcome.stats.readings, 10);

        let token = CancellationToken::new();
        token.cancel();
        let session = RecordingSession::new(started(TestMode::Normal, None), Duration::from_secs(1), token);
        let mut oven = SimulatedOven::new(TestMode::Normal, 1.0, Some(2));
        let outcome = session.run(&mut oven).await.unwrap();
        assert_eq!(outcome.end_reason, EndReason::Cancelled);
        assert_eq!(outcome.stats.readings, 0);
    }

    #[test]
    fn session_engine_is_recording() {
        let session = RecordingSession::new(
            started(TestMode::Normal, None),
            Duration::from_secs(1),
            CancellationToken::new(),
        );
        assert_eq!(session.engine().status(), RecordingStatus::Recording);
    }
}
