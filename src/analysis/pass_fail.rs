//! Pass/Fail Evaluator - measured power against the mode's expectation

use crate::types::{Expectation, MetricVerdict, PassFailResult, TestExpectation, Verdict};

/// Judge measured powers against `expectation` with a symmetric,
/// inclusive tolerance band. Unchecked metrics are N/A and never affect
/// the overall verdict; door opens only add a note.
pub fn evaluate(
    microwave_measured: f64,
    grill_measured: f64,
    expectation: TestExpectation,
    door_opens: u32,
    tolerance_percent: f64,
) -> PassFailResult {
    let mut details = Vec::new();

    let mut check = |label: &str, measured: f64, expected: Expectation| -> MetricVerdict {
        let Some(target) = expected.fixed() else {
            return MetricVerdict::NotApplicable;
        };
        let verdict = if (target - tolerance_percent..=target + tolerance_percent).contains(&measured) {
            MetricVerdict::Pass
        } else {
            MetricVerdict::Fail
        };
        details.push(format!(
            "{verdict} {label} Power: {measured:.1}% (Expected: {target}% ±{tolerance_percent}%)"
        ));
        verdict
    };

    let microwave = check("MW", microwave_measured, expectation.microwave);
    let grill = check("Grill", grill_measured, expectation.grill);

    let checked_metrics = [microwave, grill]
        .iter()
        .filter(|v| **v != MetricVerdict::NotApplicable)
        .count();
    let overall = if microwave == MetricVerdict::Fail || grill == MetricVerdict::Fail {
        Verdict::Fail
    } else {
        Verdict::Pass
    };

    if checked_metrics == 0 {
        details.push("No fixed power expectation for this mode; nothing checked".to_string());
    }
    if door_opens > 0 {
        details.push(format!("Door was opened {door_opens} time(s) during test"));
    }

    PassFailResult {
        overall,
        microwave,
        grill,
        microwave_measured,
        grill_measured,
        microwave_expected: expectation.microwave,
        grill_expected: expectation.grill,
        tolerance_percent,
        checked_metrics,
        door_opens,
        details,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mw(expected: f64) -> TestExpectation {
        TestExpectation::microwave_only(expected)
    }

    #[test]
    fn inside_band_passes() {
        let r = evaluate(41.0, 0.0, mw(40.0), 0, 5.0);
        assert_eq!(r.overall, Verdict::Pass);
        assert_eq!(r.microwave, MetricVerdict::Pass);
        assert_eq!(r.grill, MetricVerdict::NotApplicable);
        assert_eq!(r.checked_metrics, 1);
    }

    #[test]
    fn outside_band_fails() {
        let r = evaluate(46.0, 0.0, mw(40.0), 0, 5.0);
        assert_eq!(r.overall, Verdict::Fail);
        assert_eq!(r.microwave, MetricVerdict::Fail);
    }

    #[test]
    fn band_edges() {
        assert_eq!(evaluate(45.0, 0.0, mw(40.0), 0, 5.0).overall, Verdict::Pass);
        assert_eq!(evaluate(35.0, 0.0, mw(40.0), 0, 5.0).overall, Verdict::Pass);
        assert_eq!(evaluate(45.01, 0.0, mw(40.0), 0, 5.0).overall, Verdict::Fail);
        assert_eq!(evaluate(34.99, 0.0, mw(40.0), 0, 5.0).overall, Verdict::Fail);
    }

    #[test]
    fn paired_fails_if_either_fails() {
        let r = evaluate(20.0, 70.0, TestExpectation::paired(20.0, 80.0), 0, 5.0);
        assert_eq!(r.microwave, MetricVerdict::Pass);
        assert_eq!(r.grill, MetricVerdict::Fail);
        assert_eq!(r.overall, Verdict::Fail);
        assert_eq!(r.details.len(), 2);
    }

    #[test]
    fn variable_and_unset_pass_with_note() {
        let e = TestExpectation {
            microwave: Expectation::Variable,
            grill: Expectation::Unset,
        };
        let r = evaluate(63.0, 0.0, e, 0, 5.0);
        assert_eq!(r.overall, Verdict::Pass);
        assert_eq!(r.checked_metrics, 0);
        assert_eq!(r.microwave, MetricVerdict::NotApplicable);
        assert!(r.details[0].contains("No fixed power expectation"));
    }

    #[test]
    fn door_opens_never_downgrade() {
        let r = evaluate(40.0, 0.0, mw(40.0), 3, 5.0);
        assert_eq!(r.overall, Verdict::Pass);
        assert!(r.details.iter().any(|d| d.contains("3 time(s)")));
    }
}
