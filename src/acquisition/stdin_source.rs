//! Stdin Reading Source
//!
//! Reads one JSON reading per line from stdin, for piping the simulation
//! harness into the bench: `simulation --mode pasta | oven-qc run --mode pasta --source stdin`

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::warn;

use super::{AcquisitionError, SampleSource, SourceEvent};
use crate::types::Reading;

/// Line-delimited JSON readings from any buffered reader (stdin by default).
pub struct StdinSource<R = BufReader<Stdin>> {
    reader: R,
    line_buffer: Vec<u8>,
    line_number: usize,
    skipped: usize,
}

impl StdinSource {
    pub fn new() -> Self {
        Self::from_reader(BufReader::new(tokio::io::stdin()))
    }
}

impl Default for StdinSource {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: AsyncBufRead + Unpin + Send> StdinSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line_buffer: Vec::with_capacity(256),
            line_number: 0,
            skipped: 0,
        }
    }

    /// Lines that failed to parse and were skipped.
    pub fn skipped_lines(&self) -> usize {
        self.skipped
    }
}

fn parse_line(line: &str) -> Result<Option<Reading>, serde_json::Error> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    serde_json::from_str(line).map(Some)
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> SampleSource for StdinSource<R> {
    async fn next_reading(&mut self) -> Result<SourceEvent, AcquisitionError> {
        loop {
            self.line_buffer.clear();
            let bytes_read = self
                .reader
                .read_until(b'\n', &mut self.line_buffer)
                .await
                .map_err(|e| AcquisitionError::ReadFailed(format!("stdin read error: {e}")))?;

            if bytes_read == 0 {
                return Ok(SourceEvent::Eof);
            }
            self.line_number += 1;

            let Ok(line) = std::str::from_utf8(&self.line_buffer) else {
                self.skipped += 1;
                warn!(line = self.line_number, "Skipping reading with invalid UTF-8");
                continue;
            };
            match parse_line(line) {
                Ok(Some(reading)) => return Ok(SourceEvent::Reading(reading)),
                Ok(None) => {}
                Err(e) => {
                    self.skipped += 1;
                    warn!(line = self.line_number, error = %e, "Skipping malformed reading");
                }
            }
        }
    }

    fn source_name(&self) -> &str {
        "stdin"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Channel;

    #[tokio::test]
    async fn reads_lines_and_skips_garbage() {
        let input = concat!(
            "{\"elapsed_secs\":0.0,\"voltages\":{\"door\":0.1,\"microwave\":4.9}}\n",
            "not json\n",
            "\n",
            "{\"elapsed_secs\":0.5,\"voltages\":{\"grill\":5.0}}\n",
        );
        let mut source = StdinSource::from_reader(BufReader::new(input.as_bytes()));

        let SourceEvent::Reading(first) = source.next_reading().await.unwrap() else {
            panic!("expected a reading");
        };
        assert_eq!(first.voltages.get(&Channel::Microwave), Some(&4.9));

        let SourceEvent::Reading(second) = source.next_reading().await.unwrap() else {
            panic!("expected a reading");
        };
        assert_eq!(second.elapsed_secs, Some(0.5));
        assert_eq!(source.skipped_lines(), 1);

        assert_eq!(source.next_reading().await.unwrap(), SourceEvent::Eof);
    }

    #[tokio::test]
    async fn invalid_utf8_line_is_skipped() {
        let mut input = b"\xff\xfe{\"elapsed_secs\":0.0}\n".to_vec();
        input.extend_from_slice(b"{\"elapsed_secs\":0.5,\"voltages\":{\"door\":0.1}}\n");
        let mut source = StdinSource::from_reader(BufReader::new(input.as_slice()));

        let SourceEvent::Reading(reading) = source.next_reading().await.unwrap() else {
            panic!("expected a reading");
        };
        assert_eq!(reading.elapsed_secs, Some(0.5));
        assert_eq!(source.skipped_lines(), 1);
        assert_eq!(source.next_reading().await.unwrap(), SourceEvent::Eof);
    }
}
