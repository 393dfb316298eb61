//! Microwave Oven Simulation
//!
//! Generates bench readings for a healthy oven running one test mode, for
//! exercising oven-qc without hardware. Readings go to stdout (JSON lines
//! or CSV); the mission log goes to stderr.
//!
//! # Usage
//! ```bash
//! ./simulation --mode pasta --weight 200 --minutes 5 --speed 0 | ./oven-qc run --mode pasta --weight 200 --source stdin --speed 0
//! ```

use clap::{Parser, ValueEnum};
use std::io::{self, Write};
use std::time::{Duration, Instant};

use oven_qc::acquisition::{DoorEvent, SimulatedOven};
use oven_qc::analysis::DefrostScheduler;
use oven_qc::types::{Channel, ElapsedParts, TestMode};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "oven-simulation")]
#[command(about = "Simulated microwave oven signals for oven-qc testing")]
#[command(version = "1.0")]
struct Args {
    /// Test mode short code
    #[arg(short, long, default_value = "manual-mw")]
    mode: TestMode,

    /// Food weight (needed for defrost)
    #[arg(short, long)]
    weight: Option<f64>,

    /// Simulation duration in minutes
    #[arg(long, default_value = "5")]
    minutes: f64,

    /// Time compression factor (1 = real-time, 0 = as fast as possible)
    #[arg(short, long, default_value = "1")]
    speed: f64,

    #[arg(short, long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Suppress mission log (only output readings)
    #[arg(short, long)]
    quiet: bool,

    /// Output sample rate in Hz
    #[arg(long, default_value = "2")]
    sample_rate: f64,

    /// Random seed for reproducibility
    #[arg(long)]
    seed: Option<u64>,

    /// Noise standard deviation (V)
    #[arg(long, default_value = "0.02")]
    noise: f64,

    /// Open the door at this second for `--door-secs` seconds
    #[arg(long)]
    door_at: Option<f64>,

    #[arg(long, default_value = "5")]
    door_secs: f64,
}

// ============================================================================
// Mission Log
// ============================================================================

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn format_time(secs: f64) -> String {
    let total = secs.max(0.0) as u64;
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

fn log_mission(time: f64, message: &str, quiet: bool) {
    if !quiet {
        eprintln!("[{}] {}", format_time(time), message);
    }
}

// ============================================================================
// Main Entry Point
// ============================================================================

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    if !(args.sample_rate > 0.0) {
        return Err("--sample-rate must be positive".into());
    }
    let period = 1.0 / args.sample_rate;
    let duration = args.minutes * 60.0;

    let mut oven = SimulatedOven::new(args.mode, period, args.seed)
        .with_noise(args.noise)
        .with_duration(duration);

    let schedule = if args.mode == TestMode::Defrost {
        let weight = args.weight.ok_or("defrost needs --weight")?;
        let schedule = DefrostScheduler::default().schedule(weight)?;
        oven = oven.with_defrost(schedule.clone());
        Some(schedule)
    } else {
        None
    };
    if let Some(at) = args.door_at {
        oven = oven.with_door_event(DoorEvent {
            open_at_secs: at,
            close_at_secs: at + args.door_secs,
        });
    }

    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, "MICROWAVE OVEN SIMULATION v1.0", args.quiet);
    log_mission(0.0, &"=".repeat(70), args.quiet);
    log_mission(0.0, &format!("  Mode: {}", args.mode), args.quiet);
    log_mission(0.0, &format!("  {}", args.mode.description()), args.quiet);
    log_mission(0.0, &format!("  Duration: {:.1} min at {} Hz", args.minutes, args.sample_rate), args.quiet);
    if let Some(schedule) = &schedule {
        log_mission(0.0, &format!("  Defrost total: {}", schedule.total_time_label()), args.quiet);
        for sector in &schedule.sectors {
            log_mission(
                0.0,
                &format!("    {} {} ({:.1}%)", sector.name, sector.time_range_label(), sector.expected_power),
                args.quiet,
            );
        }
    }
    if let Some(seed) = args.seed {
        log_mission(0.0, &format!("  Random seed: {}", seed), args.quiet);
    }
    log_mission(0.0, &"=".repeat(70), args.quiet);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if args.format == OutputFormat::Csv {
        let columns: Vec<&str> = Channel::ALL.iter().map(|c| c.export_column()).collect();
        writeln!(out, "H,Min,Sec,ms,{}", columns.join(","))?;
    }

    let interval_real = (args.speed > 0.0).then(|| Duration::from_secs_f64(period / args.speed));
    let mut last_logged_minute = 0u64;

    while let Some(reading) = oven.next_reading_sync() {
        let loop_start = Instant::now();
        let t = reading.elapsed_secs.unwrap_or_default();

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let minute = (t / 60.0) as u64;
        if minute > last_logged_minute {
            log_mission(t, &format!("Progress: {} / {:.0} min", minute, args.minutes), args.quiet);
            last_logged_minute = minute;
        }

        match args.format {
            OutputFormat::Json => writeln!(out, "{}", serde_json::to_string(&reading)?)?,
            OutputFormat::Csv => {
                let e = ElapsedParts::from_secs(t);
                let cells: Vec<String> = Channel::ALL
                    .iter()
                    .map(|c| reading.voltages.get(c).map(|v| format!("{v:.3}")).unwrap_or_default())
                    .collect();
                writeln!(out, "{},{},{},{},{}", e.hours, e.minutes, e.seconds, e.millis, cells.join(","))?;
            }
        }
        out.flush()?;

        if let Some(interval) = interval_real {
            let elapsed = loop_start.elapsed();
            if elapsed < interval {
                std::thread::sleep(interval - elapsed);
            }
        }
    }

    log_mission(duration, "SIMULATION COMPLETE", args.quiet);
    Ok(())
}
