//! Data Export
//!
//! Writes a finished run to disk: one CSV row per recorded sample, in the
//! bench's historical column layout, plus an optional JSON summary of the
//! [`TestReport`].

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::types::{ExportRow, TestReport};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to serialize summary: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Write rows as CSV. Voltages use 3 decimals, powers 1 decimal; a channel
/// missing from a sample is an empty cell.
pub fn write_csv(path: &Path, rows: &[ExportRow]) -> Result<(), ExportError> {
    let io_err = |e| ExportError::Io(path.to_path_buf(), e);
    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);
    write_rows(&mut writer, rows).map_err(io_err)?;
    writer.flush().map_err(io_err)?;
    info!("💾 Exported {} rows to {}", rows.len(), path.display());
    Ok(())
}

/// Render rows as CSV text.
pub fn to_csv_string(rows: &[ExportRow]) -> String {
    let mut out = ExportRow::COLUMNS.join(",");
    out.push('\n');
    for row in rows {
        out.push_str(&csv_line(row));
        out.push('\n');
    }
    out
}

fn write_rows<W: Write>(out: &mut W, rows: &[ExportRow]) -> std::io::Result<()> {
    writeln!(out, "{}", ExportRow::COLUMNS.join(","))?;
    for row in rows {
        writeln!(out, "{}", csv_line(row))?;
    }
    Ok(())
}

fn csv_line(row: &ExportRow) -> String {
    let volts = |v: Option<f64>| v.map(|v| format!("{v:.3}")).unwrap_or_default();
    format!(
        "{},{},{},{},{},{},{},{},{},{:.1},{:.1}",
        row.elapsed.hours,
        row.elapsed.minutes,
        row.elapsed.seconds,
        row.elapsed.millis,
        volts(row.microwave),
        volts(row.lamp),
        volts(row.door),
        volts(row.buzzer),
        volts(row.grill),
        row.microwave_power,
        row.grill_power,
    )
}

/// Write the report as pretty-printed JSON.
pub fn write_summary_json(path: &Path, report: &TestReport) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).map_err(|e| ExportError::Io(path.to_path_buf(), e))?;
    info!("💾 Summary written to {}", path.display());
    Ok(())
}

/// Default file name for a run: `<mode>_<YYYYmmdd_HHMMSS>.csv`.
pub fn default_file_name(report: &TestReport) -> String {
    format!(
        "{}_{}.csv",
        report.mode.short_code(),
        report.started_at.format("%Y%m%d_%H%M%S")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ElapsedParts;
    use tempfile::TempDir;

    fn row(secs: f64, mw: Option<f64>) -> ExportRow {
        ExportRow {
            elapsed: ElapsedParts::from_secs(secs),
            microwave: mw,
            lamp: Some(4.95),
            door: Some(0.02),
            buzzer: Some(0.0),
            grill: Some(0.0),
            microwave_power: 80.0,
            grill_power: 0.0,
        }
    }

    #[test]
    fn csv_layout() {
        let csv = to_csv_string(&[row(62.5, Some(4.9512)), row(63.0, None)]);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(
            lines[0],
            "H,Min,Sec,ms,Microwave,Lamp,Door_SW,Buzzer,Grill,MW_Power%,Grill_Power%"
        );
        assert_eq!(lines[1], "0,1,2,500,4.951,4.950,0.020,0.000,0.000,80.0,0.0");
        assert_eq!(lines[2], "0,1,3,0,,4.950,0.020,0.000,0.000,80.0,0.0");
    }

    #[test]
    fn writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.csv");
        write_csv(&path, &[row(0.0, Some(5.0))]).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn file_matches_rendered_string() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("run.csv");
        let rows = [row(0.0, Some(5.0)), row(0.5, None)];
        write_csv(&path, &rows).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), to_csv_string(&rows));
    }

    #[test]
    fn unwritable_path_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("run.csv");
        assert!(matches!(write_csv(&path, &[]), Err(ExportError::Io(..))));
    }
}
