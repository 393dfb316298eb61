//! Power Aggregator - duty-cycle power% over a trailing sample window
//!
//! Power is never stored; it is recomputed from the sample history on
//! demand, both for the live display and for every row of an export.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::types::{Channel, Sample};

/// Window convention for per-row power% in exported data.
///
/// The live metric always includes the newest sample. The bench's
/// historical export instead used the samples *before* row `i` once the
/// history was longer than the window, so an exported row can differ from
/// what was displayed live at that instant.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ExportWindowing {
    /// `[i-W, i)` for `i >= W`, `[0, i]` before that
    #[default]
    Preceding,
    /// `[i-W+1, i]`, same as the live metric
    Trailing,
}

/// Power% and the number of samples it was computed over.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct PowerReading {
    pub percent: f64,
    pub samples_in_window: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerAggregator {
    window: usize,
    on_threshold: f64,
}

impl PowerAggregator {
    pub fn new(window: usize, on_threshold: f64) -> Self {
        Self {
            window: window.max(1),
            on_threshold,
        }
    }

    /// Live power over the last `min(W, len)` samples. `(0, 0)` when empty.
    pub fn power_percent(&self, channel: Channel, history: &VecDeque<Sample>) -> PowerReading {
        let start = history.len().saturating_sub(self.window);
        self.power_over(channel, history.range(start..))
    }

    /// Power as it would be reported for row `index` of an export.
    pub fn power_at(
        &self,
        channel: Channel,
        history: &VecDeque<Sample>,
        index: usize,
        windowing: ExportWindowing,
    ) -> PowerReading {
        if index >= history.len() {
            return PowerReading::default();
        }
        let range = match windowing {
            ExportWindowing::Preceding if index >= self.window => (index - self.window)..index,
            ExportWindowing::Preceding => 0..(index + 1),
            ExportWindowing::Trailing => (index + 1).saturating_sub(self.window)..(index + 1),
        };
        self.power_over(channel, history.range(range))
    }

    /// Per-row power for the whole history.
    pub fn retrospective(
        &self,
        channel: Channel,
        history: &VecDeque<Sample>,
        windowing: ExportWindowing,
    ) -> Vec<PowerReading> {
        (0..history.len())
            .map(|i| self.power_at(channel, history, i, windowing))
            .collect()
    }

    #[allow(clippy::cast_precision_loss)]
    fn power_over<'a>(
        &self,
        channel: Channel,
        samples: impl Iterator<Item = &'a Sample>,
    ) -> PowerReading {
        let (mut total, mut on) = (0usize, 0usize);
        for sample in samples {
            total += 1;
            if sample
                .voltage(channel)
                .is_some_and(|v| v >= self.on_threshold)
            {
                on += 1;
            }
        }
        if total == 0 {
            return PowerReading::default();
        }
        PowerReading {
            percent: on as f64 * 100.0 / total as f64,
            samples_in_window: total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn history(mw: &[f64]) -> VecDeque<Sample> {
        mw.iter()
            .enumerate()
            .map(|(i, v)| Sample {
                timestamp: Utc::now(),
                elapsed_secs: i as f64,
                voltages: [(Channel::Microwave, *v)].into_iter().collect(),
            })
            .collect()
    }

    #[test]
    fn only_last_window_counts() {
        let mut v = vec![0.0; 50];
        v.extend(vec![5.0; 100]);
        let agg = PowerAggregator::new(100, 4.6);
        let r = agg.power_percent(Channel::Microwave, &history(&v));
        assert_eq!(r.percent, 100.0);
        assert_eq!(r.samples_in_window, 100);
    }

    #[test]
    fn empty_history_is_zero() {
        let agg = PowerAggregator::new(100, 4.6);
        let r = agg.power_percent(Channel::Microwave, &VecDeque::new());
        assert_eq!(r, PowerReading { percent: 0.0, samples_in_window: 0 });
    }

    #[test]
    fn short_history_is_not_padded() {
        let agg = PowerAggregator::new(100, 4.6);
        let r = agg.power_percent(Channel::Microwave, &history(&[5.0, 0.0, 0.0, 5.0]));
        assert_eq!(r.percent, 50.0);
        assert_eq!(r.samples_in_window, 4);
    }

    #[test]
    fn missing_channel_counts_as_off() {
        let agg = PowerAggregator::new(10, 4.6);
        let r = agg.power_percent(Channel::Grill, &history(&[5.0, 5.0]));
        assert_eq!(r.percent, 0.0);
        assert_eq!(r.samples_in_window, 2);
    }

    #[test]
    fn preceding_window_excludes_current_row_once_full() {
        // W = 2: rows 0 and 1 include themselves, row 2 looks at [0, 2)
        let agg = PowerAggregator::new(2, 4.6);
        let h = history(&[5.0, 5.0, 0.0, 0.0]);
        let rows = agg.retrospective(Channel::Microwave, &h, ExportWindowing::Preceding);
        let pct: Vec<f64> = rows.iter().map(|r| r.percent).collect();
        assert_eq!(pct, vec![100.0, 100.0, 100.0, 50.0]);
        assert_eq!(rows[0].samples_in_window, 1);
        assert_eq!(rows[3].samples_in_window, 2);
    }

    #[test]
    fn trailing_window_matches_live_metric() {
        let agg = PowerAggregator::new(3, 4.6);
        let h = history(&[5.0, 0.0, 5.0, 0.0, 0.0, 5.0]);
        let rows = agg.retrospective(Channel::Microwave, &h, ExportWindowing::Trailing);
        let live = agg.power_percent(Channel::Microwave, &h);
        assert_eq!(rows.last().copied(), Some(live));
    }

    #[test]
    fn index_past_end_is_zero() {
        let agg = PowerAggregator::new(3, 4.6);
        let h = history(&[5.0]);
        assert_eq!(
            agg.power_at(Channel::Microwave, &h, 5, ExportWindowing::Trailing),
            PowerReading::default()
        );
    }
}
