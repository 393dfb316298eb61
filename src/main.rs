//! oven-qc - Microwave Oven QC Test Bench
//!
//! # Usage
//!
//! ```bash
//! # Run a pasta test against the built-in simulated oven
//! oven-qc run --mode pasta --weight 200 --duration 300 --speed 0
//!
//! # Run from piped JSON readings
//! simulation --mode fish --weight 400 | oven-qc run --mode fish --weight 400 --source stdin --speed 0
//!
//! # Replay a previously exported run
//! oven-qc run --mode c1 --source csv --csv c1_20250101_120000.csv --speed 0
//! ```
//!
//! # Environment Variables
//!
//! - `OVEN_QC_CONFIG`: Path to the bench config TOML (default: ./bench_config.toml)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{bail, Context, Result};
use chrono::{Duration as ChronoDuration, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use oven_qc::acquisition::{CsvReplaySource, DoorEvent, SampleSource, SimulatedOven, StdinSource};
use oven_qc::analysis::DefrostScheduler;
use oven_qc::config::BenchConfig;
use oven_qc::export;
use oven_qc::pipeline::RecordingSession;
use oven_qc::storage::ReportStore;
use oven_qc::types::TestMode;
use oven_qc::TestEngine;

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "oven-qc")]
#[command(about = "Microwave oven QC test bench")]
#[command(version)]
struct CliArgs {
    /// Bench config TOML (overrides OVEN_QC_CONFIG and ./bench_config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record and evaluate one test run
    Run(RunArgs),

    /// List the test-mode catalog
    Modes,

    /// Print the defrost sector table for a weight
    Defrost {
        /// Food weight in grams
        #[arg(long)]
        weight: f64,
    },

    /// List stored test reports
    History {
        /// Number of reports to show
        #[arg(long, default_value = "20")]
        limit: usize,

        /// Delete reports older than the configured retention first
        #[arg(long)]
        prune: bool,

        /// Delete all stored reports
        #[arg(long)]
        clear: bool,
    },

    /// Write the default config to a TOML file
    InitConfig {
        #[arg(long, default_value = "bench_config.toml")]
        path: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum SourceKind {
    Simulated,
    Stdin,
    Csv,
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Test mode short code (see `oven-qc modes`)
    #[arg(long)]
    mode: TestMode,

    /// Food weight (g, or ml for beverages)
    #[arg(long)]
    weight: Option<f64>,

    #[arg(long, value_enum, default_value = "simulated")]
    source: SourceKind,

    /// CSV file for `--source csv`
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Stop after this many seconds of test time
    #[arg(long)]
    duration: Option<f64>,

    /// Speed multiplier (1 = realtime, 10 = 10x faster, 0 = no delay)
    #[arg(long, default_value = "1")]
    speed: f64,

    /// Seed for the simulated oven's noise
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated door opening as START:END seconds (repeatable)
    #[arg(long = "door-open", value_name = "START:END")]
    door_open: Vec<String>,

    /// Write the recorded data as CSV (file path, or a directory for an auto-named file)
    #[arg(long)]
    export: Option<PathBuf>,

    /// Write the test report as JSON
    #[arg(long)]
    summary: Option<PathBuf>,

    /// Do not store the report in the history database
    #[arg(long)]
    no_store: bool,
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    let config = match &args.config {
        Some(path) => BenchConfig::load_from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => BenchConfig::load(),
    };

    match args.command {
        Command::Run(run) => run_test(&config, run).await,
        Command::Modes => {
            print_modes();
            Ok(())
        }
        Command::Defrost { weight } => print_defrost(&config, weight),
        Command::History {
            limit,
            prune,
            clear,
        } => show_history(&config, limit, prune, clear),
        Command::InitConfig { path, force } => {
            if path.exists() && !force {
                bail!("{} already exists (use --force to overwrite)", path.display());
            }
            config
                .save_to_file(&path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("📝 Wrote config to {}", path.display());
            Ok(())
        }
    }
}

// ============================================================================
// Run
// ============================================================================

async fn run_test(config: &BenchConfig, args: RunArgs) -> Result<()> {
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  OVEN QC - {}", config.device.name);
    info!("  Mode: {}", args.mode);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    let mut engine = TestEngine::new(config);
    engine
        .start(args.mode, args.weight, Utc::now())
        .context("Cannot start test")?;

    let sample_period = config.device.sample_period();
    let mut source: Box<dyn SampleSource> = match args.source {
        SourceKind::Simulated => {
            let mut oven =
                SimulatedOven::new(args.mode, sample_period.as_secs_f64(), args.seed);
            if let Some(schedule) = engine.defrost_schedule() {
                oven = oven.with_defrost(schedule.clone());
            }
            if let Some(d) = args.duration {
                oven = oven.with_duration(d);
            }
            for event in &args.door_open {
                oven = oven.with_door_event(parse_door_event(event)?);
            }
            Box::new(oven)
        }
        SourceKind::Stdin => Box::new(StdinSource::new()),
        SourceKind::Csv => {
            let path = args.csv.as_ref().context("--source csv requires --csv <path>")?;
            Box::new(
                CsvReplaySource::from_path(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
            )
        }
    };

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, stopping recording...");
        shutdown_token.cancel();
    });

    let mut session =
        RecordingSession::new(engine, sample_period, cancel_token).with_speed(args.speed);
    if let Some(d) = args.duration {
        session = session.with_max_duration(d);
    }
    let outcome = session.run(source.as_mut()).await?;

    if let Some(path) = &args.export {
        let path = if path.is_dir() {
            path.join(export::default_file_name(&outcome.report))
        } else {
            path.clone()
        };
        export::write_csv(&path, &outcome.rows)?;
    }
    if let Some(path) = &args.summary {
        export::write_summary_json(path, &outcome.report)?;
    }

    if args.no_store {
        return Ok(());
    }
    match ReportStore::open(&config.storage.report_db_path) {
        Ok(store) => {
            store
                .store_report(&outcome.report)
                .context("Failed to store report")?;
            info!("🗄️  Report stored ({} in history)", store.count());
        }
        Err(e) => warn!("Report history unavailable: {}", e),
    }
    Ok(())
}

fn parse_door_event(event: &str) -> Result<DoorEvent> {
    let (start, end) = event
        .split_once(':')
        .with_context(|| format!("invalid door event '{event}', expected START:END"))?;
    let open_at_secs: f64 = start.trim().parse().context("invalid door open time")?;
    let close_at_secs: f64 = end.trim().parse().context("invalid door close time")?;
    if close_at_secs <= open_at_secs {
        bail!("door event '{event}' closes before it opens");
    }
    Ok(DoorEvent {
        open_at_secs,
        close_at_secs,
    })
}

// ============================================================================
// Catalog / Defrost / History
// ============================================================================

fn print_modes() {
    println!("{:<14} {:<40} {}", "CODE", "MODE", "WEIGHT");
    for mode in TestMode::ALL {
        let weight = mode.weight_range().map_or_else(
            || "-".to_string(),
            |r| format!("{}-{} {} (step {})", r.min, r.max, r.unit, r.step),
        );
        println!("{:<14} {:<40} {}", mode.short_code(), mode.display_name(), weight);
        println!("{:<14} {}", "", mode.description());
    }
}

fn print_defrost(config: &BenchConfig, weight: f64) -> Result<()> {
    let schedule = DefrostScheduler::new(config.defrost.clone()).schedule(weight)?;
    println!(
        "Defrost {} g: total {} ({:.2} min)",
        schedule.weight_grams,
        schedule.total_time_label(),
        schedule.total_minutes
    );
    for sector in &schedule.sectors {
        println!(
            "  {:<9} {:>13}  {:>5.1}%  {:.0}s on / {:.0}s off",
            sector.name,
            sector.time_range_label(),
            sector.expected_power,
            sector.on_secs,
            sector.off_secs
        );
    }
    Ok(())
}

fn show_history(config: &BenchConfig, limit: usize, prune: bool, clear: bool) -> Result<()> {
    let store = ReportStore::open(&config.storage.report_db_path).with_context(|| {
        format!(
            "Failed to open report history {}",
            config.storage.report_db_path.display()
        )
    })?;

    if clear {
        store.clear()?;
        info!("🗑️  Report history cleared");
        return Ok(());
    }
    if prune {
        let cutoff = Utc::now() - ChronoDuration::days(config.storage.retention_days);
        let deleted = store.cleanup_before(cutoff)?;
        info!("🗑️  Pruned {} report(s) older than {} days", deleted, config.storage.retention_days);
    }

    let reports = store.get_recent(limit);
    if reports.is_empty() {
        println!("No stored test reports.");
        return Ok(());
    }
    for report in &reports {
        println!("{}", report.summary_line());
    }
    println!("({} of {} stored)", reports.len(), store.count());
    Ok(())
}
