//! Warning Detector - per-sample anomaly checks
//!
//! Runs once per sample and keeps the only cross-tick state the checks
//! need: the previous door state, the door-open counter and the start of
//! the current MW + Grill overlap run.

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::classifier::ChannelPolicy;
use crate::config::WarningConfig;
use crate::types::{BenchWarning, Channel, Sample, SignalState};

/// How often a sustained overlap is reported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OverlapPolicy {
    /// Never report
    Off,
    /// First tick past the tolerance, once per overlap run
    Once,
    /// Every tick past the tolerance
    #[default]
    Repeating,
}

#[derive(Debug, Clone)]
pub struct WarningDetector {
    policy: ChannelPolicy,
    tolerance_secs: f64,
    overlap_policy: OverlapPolicy,
    warn_door_indeterminate: bool,
    forbid_overlap: bool,

    door_open: bool,
    door_opens: u32,
    overlap_start: Option<f64>,
    overlap_reported: bool,
}

impl WarningDetector {
    pub fn new(policy: ChannelPolicy, config: &WarningConfig) -> Self {
        Self {
            policy,
            tolerance_secs: config.overlap_tolerance_secs,
            overlap_policy: config.overlap_policy,
            warn_door_indeterminate: config.warn_door_indeterminate,
            forbid_overlap: false,
            door_open: false,
            door_opens: 0,
            overlap_start: None,
            overlap_reported: false,
        }
    }

    /// Raise a warning on every tick where MW and Grill are both on.
    pub fn with_forbidden_overlap(mut self, forbid: bool) -> Self {
        self.forbid_overlap = forbid;
        self
    }

    pub fn door_opens(&self) -> u32 {
        self.door_opens
    }

    /// Door state after the last checked sample that fell in the open or closed band.
    pub fn is_door_open(&self) -> bool {
        self.door_open
    }

    /// Length of the ongoing overlap at `now`, 0 when none.
    pub fn overlap_duration(&self, now_secs: f64) -> f64 {
        self.overlap_start.map_or(0.0, |start| (now_secs - start).max(0.0))
    }

    /// Run all checks against one sample; warnings come back in check order.
    pub fn check(&mut self, sample: &Sample) -> Vec<BenchWarning> {
        let mut warnings = Vec::new();

        // Signal sanity per channel
        for channel in Channel::ALL {
            match sample.voltage(channel) {
                None => warnings.push(BenchWarning::MissingChannel { channel }),
                Some(v) if !v.is_finite() => warnings.push(BenchWarning::MissingChannel { channel }),
                Some(v) if self.policy.is_out_of_range(v) => {
                    warnings.push(BenchWarning::OutOfRange {
                        channel,
                        voltage: v,
                    });
                }
                Some(v) => {
                    if channel == Channel::Door
                        && self.warn_door_indeterminate
                        && self.policy.classify(channel, v) == SignalState::Unknown
                    {
                        warnings.push(BenchWarning::DoorIndeterminate { voltage: v });
                    }
                }
            }
        }

        // Door closed -> open edge; a dead-zone or unusable reading keeps the previous state
        let door = sample
            .voltage(Channel::Door)
            .filter(|v| v.is_finite())
            .map(|v| self.policy.classify(Channel::Door, v));
        let open = match door {
            Some(SignalState::Open) => Some(true),
            Some(SignalState::Closed) => Some(false),
            _ => None,
        };
        if let Some(open) = open {
            if open && !self.door_open {
                self.door_opens += 1;
                debug!(count = self.door_opens, "Door opened");
                warnings.push(BenchWarning::DoorOpened {
                    count: self.door_opens,
                });
            }
            self.door_open = open;
        }

        // MW + Grill overlap
        let both_on = [Channel::Microwave, Channel::Grill].iter().all(|&ch| {
            sample
                .voltage(ch)
                .is_some_and(|v| v.is_finite() && self.policy.is_high(v))
        });
        if both_on {
            match self.overlap_start {
                None => {
                    self.overlap_start = Some(sample.elapsed_secs);
                    self.overlap_reported = false;
                }
                Some(start) => {
                    let duration = sample.elapsed_secs - start;
                    if duration > self.tolerance_secs {
                        let report = match self.overlap_policy {
                            OverlapPolicy::Off => false,
                            OverlapPolicy::Once => !self.overlap_reported,
                            OverlapPolicy::Repeating => true,
                        };
                        if report {
                            self.overlap_reported = true;
                            warnings.push(BenchWarning::Overlap {
                                duration_secs: duration,
                            });
                        }
                    }
                }
            }
            if self.forbid_overlap {
                warnings.push(BenchWarning::ForbiddenOverlap);
            }
        } else {
            self.overlap_start = None;
            self.overlap_reported = false;
        }

        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample(t: f64, door: f64, mw: f64, grill: f64) -> Sample {
        Sample {
            timestamp: Utc::now(),
            elapsed_secs: t,
            voltages: [
                (Channel::Door, door),
                (Channel::Lamp, 0.0),
                (Channel::Microwave, mw),
                (Channel::Grill, grill),
                (Channel::Buzzer, 0.0),
            ]
            .into_iter()
            .collect(),
        }
    }

    fn detector(policy: OverlapPolicy) -> WarningDetector {
        let config = WarningConfig {
            overlap_policy: policy,
            ..WarningConfig::default()
        };
        WarningDetector::new(ChannelPolicy::default(), &config)
    }

    fn overlap_count(d: &mut WarningDetector, times: &[f64], mw: f64, grill: f64) -> usize {
        times
            .iter()
            .flat_map(|&t| d.check(&sample(t, 0.0, mw, grill)))
            .filter(BenchWarning::is_overlap)
            .count()
    }

    #[test]
    fn three_second_overlap_warns() {
        let mut d = detector(OverlapPolicy::Repeating);
        assert!(overlap_count(&mut d, &[0.0, 1.0, 2.0, 3.0], 5.0, 5.0) >= 1);
    }

    #[test]
    fn short_overlap_is_tolerated() {
        let mut d = detector(OverlapPolicy::Repeating);
        assert_eq!(overlap_count(&mut d, &[0.0, 0.5, 1.0, 1.5], 5.0, 5.0), 0);
    }

    #[test]
    fn overlap_clears_when_either_turns_off() {
        let mut d = detector(OverlapPolicy::Once);
        assert_eq!(overlap_count(&mut d, &[0.0, 1.0, 2.0, 3.0], 5.0, 5.0), 1);
        assert_eq!(overlap_count(&mut d, &[4.0], 5.0, 0.0), 0);
        assert_eq!(d.overlap_duration(4.0), 0.0);
        // A fresh episode reports again
        assert_eq!(overlap_count(&mut d, &[5.0, 6.0, 7.0, 8.0], 5.0, 5.0), 1);
    }

    #[test]
    fn overlap_policies() {
        let times: Vec<f64> = (0..6).map(f64::from).collect();
        assert_eq!(overlap_count(&mut detector(OverlapPolicy::Off), &times, 5.0, 5.0), 0);
        assert_eq!(overlap_count(&mut detector(OverlapPolicy::Once), &times, 5.0, 5.0), 1);
        // durations 3, 4, 5 exceed 2 s
        assert_eq!(overlap_count(&mut detector(OverlapPolicy::Repeating), &times, 5.0, 5.0), 3);
    }

    #[test]
    fn overlap_warning_carries_duration() {
        let mut d = detector(OverlapPolicy::Repeating);
        let warnings: Vec<_> = [0.0, 3.0]
            .iter()
            .flat_map(|&t| d.check(&sample(t, 0.0, 5.0, 5.0)))
            .collect();
        assert_eq!(warnings, vec![BenchWarning::Overlap { duration_secs: 3.0 }]);
    }

    #[test]
    fn door_counts_rising_edges_only() {
        let mut d = detector(OverlapPolicy::Repeating);
        let doors = [0.0, 4.8, 4.8, 4.8, 0.1, 4.9, 0.0];
        let opened: usize = doors
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                d.check(&sample(i as f64, v, 0.0, 0.0))
                    .iter()
                    .filter(|w| matches!(w, BenchWarning::DoorOpened { .. }))
                    .count()
            })
            .sum();
        assert_eq!(opened, 2);
        assert_eq!(d.door_opens(), 2);
        assert!(!d.is_door_open());
    }

    fn door_opens_for(d: &mut WarningDetector, doors: &[f64]) -> u32 {
        for (i, &v) in doors.iter().enumerate() {
            d.check(&sample(i as f64, v, 0.0, 0.0));
        }
        d.door_opens()
    }

    #[test]
    fn dead_zone_flicker_keeps_door_open() {
        let mut d = detector(OverlapPolicy::Repeating);
        assert_eq!(door_opens_for(&mut d, &[0.0, 4.9, 2.0, 4.9]), 1);
        assert!(d.is_door_open());

        // Dead zone after closing keeps it closed
        let mut d = detector(OverlapPolicy::Repeating);
        assert_eq!(door_opens_for(&mut d, &[0.0, 4.9, 0.2, 2.0]), 1);
        assert!(!d.is_door_open());
    }

    #[test]
    fn open_band_edge_counts_as_opening() {
        let mut d = detector(OverlapPolicy::Repeating);
        let w = d.check(&sample(0.0, 4.55, 0.0, 0.0));
        assert_eq!(w, vec![BenchWarning::DoorOpened { count: 1 }]);
        assert!(d.is_door_open());
    }

    #[test]
    fn out_of_range_and_dead_zone() {
        let mut d = detector(OverlapPolicy::Repeating);
        let w = d.check(&sample(0.0, 2.0, 6.0, -1.0));
        assert!(w.contains(&BenchWarning::DoorIndeterminate { voltage: 2.0 }));
        assert!(w.contains(&BenchWarning::OutOfRange {
            channel: Channel::Microwave,
            voltage: 6.0
        }));
        assert!(w.contains(&BenchWarning::OutOfRange {
            channel: Channel::Grill,
            voltage: -1.0
        }));
    }

    #[test]
    fn missing_channel_is_reported_not_fatal() {
        let mut d = detector(OverlapPolicy::Repeating);
        let mut s = sample(0.0, 0.0, 0.0, 0.0);
        s.voltages.remove(&Channel::Buzzer);
        let w = d.check(&s);
        assert_eq!(w, vec![BenchWarning::MissingChannel { channel: Channel::Buzzer }]);
    }

    #[test]
    fn forbidden_overlap_fires_every_both_on_tick() {
        let mut d = detector(OverlapPolicy::Off).with_forbidden_overlap(true);
        let count = [0.0, 1.0]
            .iter()
            .flat_map(|&t| d.check(&sample(t, 0.0, 5.0, 5.0)))
            .filter(|w| matches!(w, BenchWarning::ForbiddenOverlap))
            .count();
        assert_eq!(count, 2);
    }
}
