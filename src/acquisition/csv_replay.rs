//! CSV Replay Source
//!
//! Replays a data file previously written by the exporter. Columns are
//! located by header name so the power columns (recomputed on replay) and
//! any extra columns are ignored. Empty voltage cells come back as missing
//! channels.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::path::Path;

use super::{AcquisitionError, SampleSource, SourceEvent};
use crate::types::{Channel, Reading, Voltages};

pub struct CsvReplaySource {
    name: String,
    readings: VecDeque<Reading>,
}

/// Column positions resolved from the header row.
struct Layout {
    hours: usize,
    minutes: usize,
    seconds: usize,
    millis: usize,
    channels: Vec<(Channel, usize)>,
}

impl Layout {
    fn from_header(header: &str) -> Result<Self, AcquisitionError> {
        let columns: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |name: &str| {
            columns
                .iter()
                .position(|c| c.eq_ignore_ascii_case(name))
                .ok_or_else(|| AcquisitionError::Malformed {
                    line: 1,
                    reason: format!("missing column '{name}'"),
                })
        };
        let channels = Channel::ALL
            .into_iter()
            .filter_map(|ch| {
                columns
                    .iter()
                    .position(|c| Channel::parse(c) == Some(ch))
                    .map(|i| (ch, i))
            })
            .collect();
        Ok(Self {
            hours: find("H")?,
            minutes: find("Min")?,
            seconds: find("Sec")?,
            millis: find("ms")?,
            channels,
        })
    }
}

impl CsvReplaySource {
    pub fn from_path(path: &Path) -> Result<Self, AcquisitionError> {
        let content = std::fs::read_to_string(path)?;
        let mut source = Self::parse(&content)?;
        source.name = format!("CSV ({})", path.display());
        Ok(source)
    }

    /// Parse a whole exported file. Fails on the first malformed row.
    pub fn parse(content: &str) -> Result<Self, AcquisitionError> {
        let mut lines = content.lines().enumerate();
        let header = lines
            .by_ref()
            .find(|(_, l)| !l.trim().is_empty())
            .map(|(_, l)| l)
            .ok_or(AcquisitionError::Malformed {
                line: 1,
                reason: "empty file".to_string(),
            })?;
        let layout = Layout::from_header(header)?;

        let mut readings = VecDeque::new();
        for (index, line) in lines {
            if line.trim().is_empty() {
                continue;
            }
            readings.push_back(parse_row(&layout, line, index + 1)?);
        }

        Ok(Self {
            name: "CSV".to_string(),
            readings,
        })
    }

    pub fn remaining(&self) -> usize {
        self.readings.len()
    }
}

fn parse_row(layout: &Layout, line: &str, line_no: usize) -> Result<Reading, AcquisitionError> {
    let cells: Vec<&str> = line.split(',').map(str::trim).collect();
    let malformed = |reason: String| AcquisitionError::Malformed {
        line: line_no,
        reason,
    };
    let number = |index: usize, name: &str| -> Result<f64, AcquisitionError> {
        let cell = cells
            .get(index)
            .ok_or_else(|| malformed(format!("missing '{name}' cell")))?;
        cell.parse::<f64>()
            .map_err(|_| malformed(format!("invalid '{name}' value '{cell}'")))
    };

    let elapsed = number(layout.hours, "H")? * 3600.0
        + number(layout.minutes, "Min")? * 60.0
        + number(layout.seconds, "Sec")?
        + number(layout.millis, "ms")? / 1000.0;

    let mut voltages = Voltages::new();
    for &(channel, index) in &layout.channels {
        match cells.get(index) {
            None | Some(&"") => {}
            Some(_) => {
                voltages.insert(channel, number(index, channel.export_column())?);
            }
        }
    }
    Ok(Reading::at_elapsed(elapsed, voltages))
}

#[async_trait]
impl SampleSource for CsvReplaySource {
    async fn next_reading(&mut self) -> Result<SourceEvent, AcquisitionError> {
        Ok(self
            .readings
            .pop_front()
            .map_or(SourceEvent::Eof, SourceEvent::Reading))
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}
