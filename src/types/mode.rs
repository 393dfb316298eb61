//! Test-mode catalog and per-mode power expectations

use serde::{Deserialize, Serialize};

// ============================================================================
// Expectation
// ============================================================================

/// Expected duty-cycle power for one metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(tag = "kind", content = "percent", rename_all = "snake_case")]
pub enum Expectation {
    /// A fixed expected power percentage
    Fixed(f64),
    /// Operator-selected power; not checked
    Variable,
    /// No expectation for this metric
    #[default]
    Unset,
}

impl Expectation {
    /// The expected percentage, if this metric is checkable.
    pub const fn fixed(self) -> Option<f64> {
        match self {
            Self::Fixed(p) => Some(p),
            Self::Variable | Self::Unset => None,
        }
    }
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fixed(p) => write!(f, "{p}%"),
            Self::Variable => write!(f, "variable"),
            Self::Unset => write!(f, "N/A"),
        }
    }
}

/// Expectations for both power-bearing channels, fixed at recording start.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct TestExpectation {
    pub microwave: Expectation,
    pub grill: Expectation,
}

impl TestExpectation {
    pub const fn microwave_only(percent: f64) -> Self {
        Self {
            microwave: Expectation::Fixed(percent),
            grill: Expectation::Unset,
        }
    }

    pub const fn paired(microwave: f64, grill: f64) -> Self {
        Self {
            microwave: Expectation::Fixed(microwave),
            grill: Expectation::Fixed(grill),
        }
    }
}

// ============================================================================
// Weight Range
// ============================================================================

/// Operator input range for modes that take a food weight (or volume).
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct WeightRange {
    pub min: f64,
    pub max: f64,
    pub step: f64,
    pub unit: &'static str,
}

impl WeightRange {
    const fn grams(min: f64, max: f64, step: f64) -> Self {
        Self { min, max, step, unit: "g" }
    }

    pub fn contains(&self, weight: f64) -> bool {
        weight.is_finite() && weight >= self.min && weight <= self.max
    }
}

// ============================================================================
// Test Mode
// ============================================================================

/// Every test program the bench can run.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TestMode {
    ManualMicrowave,
    ManualGrill,
    CombinationC1,
    CombinationC2,
    Defrost,
    Popcorn,
    Meat,
    Pizza,
    Chicken,
    Rice,
    Beverages,
    Pasta,
    Fish,
    Normal,
}

impl TestMode {
    pub const ALL: [Self; 14] = [
        Self::ManualMicrowave,
        Self::ManualGrill,
        Self::CombinationC1,
        Self::CombinationC2,
        Self::Defrost,
        Self::Popcorn,
        Self::Meat,
        Self::Pizza,
        Self::Chicken,
        Self::Rice,
        Self::Beverages,
        Self::Pasta,
        Self::Fish,
        Self::Normal,
    ];

    /// Get display name for UI and reports
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::ManualMicrowave => "Manual: Microwave",
            Self::ManualGrill => "Manual: Grill",
            Self::CombinationC1 => "Combination: C1 (20% MW / 80% Grill)",
            Self::CombinationC2 => "Combination: C2 (40% MW / 60% Grill)",
            Self::Defrost => "Defrost",
            Self::Popcorn => "Auto Menu: Popcorn",
            Self::Meat => "Auto Menu: Meat",
            Self::Pizza => "Auto Menu: Pizza",
            Self::Chicken => "Auto Menu: Chicken",
            Self::Rice => "Auto Menu: Rice",
            Self::Beverages => "Auto Menu: Beverages",
            Self::Pasta => "Auto Menu: Pasta",
            Self::Fish => "Auto Menu: Fish",
            Self::Normal => "Normal",
        }
    }

    /// Get short code for CLI and logging
    pub const fn short_code(self) -> &'static str {
        match self {
            Self::ManualMicrowave => "manual-mw",
            Self::ManualGrill => "manual-grill",
            Self::CombinationC1 => "c1",
            Self::CombinationC2 => "c2",
            Self::Defrost => "defrost",
            Self::Popcorn => "popcorn",
            Self::Meat => "meat",
            Self::Pizza => "pizza",
            Self::Chicken => "chicken",
            Self::Rice => "rice",
            Self::Beverages => "beverages",
            Self::Pasta => "pasta",
            Self::Fish => "fish",
            Self::Normal => "normal",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            Self::ManualMicrowave => {
                "Manual microwave test; power level 10P-100P selected on the oven (not checked)"
            }
            Self::ManualGrill => "Manual grill test at 100% power",
            Self::CombinationC1 => "20% MW + 80% Grill, alternating with no overlap",
            Self::CombinationC2 => "40% MW + 60% Grill, alternating with no overlap",
            Self::Defrost => "Weight-based defrost with 3 sectors (36.7%, 23.3%, 30%)",
            Self::Popcorn => "100% MW, 50-150 g",
            Self::Meat => "100% MW, 100-1000 g",
            Self::Pizza => "100% MW, 100-900 g",
            Self::Chicken => "53% MW + 47% Grill, alternating with no overlap",
            Self::Rice => "100% MW, 100-800 g",
            Self::Beverages => "100% MW, 150-600 ml",
            Self::Pasta => "80% MW, 50-350 g",
            Self::Fish => "77% MW, 200-1000 g",
            Self::Normal => "Tracks how long the oven stays idle (MW and grill off)",
        }
    }

    /// Expected powers checked by the pass/fail evaluator.
    pub const fn expectation(self) -> TestExpectation {
        match self {
            Self::ManualMicrowave => TestExpectation {
                microwave: Expectation::Variable,
                grill: Expectation::Unset,
            },
            Self::ManualGrill => TestExpectation {
                microwave: Expectation::Unset,
                grill: Expectation::Fixed(100.0),
            },
            Self::CombinationC1 => TestExpectation::paired(20.0, 80.0),
            Self::CombinationC2 => TestExpectation::paired(40.0, 60.0),
            Self::Chicken => TestExpectation::paired(53.0, 47.0),
            Self::Popcorn | Self::Meat | Self::Pizza | Self::Rice | Self::Beverages => {
                TestExpectation::microwave_only(100.0)
            }
            Self::Pasta => TestExpectation::microwave_only(80.0),
            Self::Fish => TestExpectation::microwave_only(77.0),
            Self::Defrost | Self::Normal => TestExpectation {
                microwave: Expectation::Unset,
                grill: Expectation::Unset,
            },
        }
    }

    /// Operator weight range, for modes that take one.
    pub const fn weight_range(self) -> Option<WeightRange> {
        match self {
            Self::Defrost => Some(WeightRange::grams(100.0, 2000.0, 100.0)),
            Self::Popcorn => Some(WeightRange::grams(50.0, 150.0, 50.0)),
            Self::Meat => Some(WeightRange::grams(100.0, 1000.0, 50.0)),
            Self::Pizza => Some(WeightRange::grams(100.0, 900.0, 50.0)),
            Self::Chicken => Some(WeightRange::grams(50.0, 1500.0, 50.0)),
            Self::Rice => Some(WeightRange::grams(100.0, 800.0, 50.0)),
            Self::Beverages => Some(WeightRange {
                min: 150.0,
                max: 600.0,
                step: 150.0,
                unit: "ml",
            }),
            Self::Pasta => Some(WeightRange::grams(50.0, 350.0, 50.0)),
            Self::Fish => Some(WeightRange::grams(200.0, 1000.0, 100.0)),
            Self::ManualMicrowave
            | Self::ManualGrill
            | Self::CombinationC1
            | Self::CombinationC2
            | Self::Normal => None,
        }
    }

    pub const fn requires_weight(self) -> bool {
        self.weight_range().is_some()
    }

    /// Modes where microwave and grill must alternate and never be on together.
    pub const fn forbids_overlap(self) -> bool {
        matches!(self, Self::CombinationC1 | Self::CombinationC2 | Self::Chicken)
    }
}

impl std::fmt::Display for TestMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown test mode '{0}' (run `oven-qc modes` for the list)")]
pub struct UnknownTestMode(pub String);

impl std::str::FromStr for TestMode {
    type Err = UnknownTestMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|m| m.short_code() == needle || m.display_name().to_lowercase() == needle)
            .ok_or_else(|| UnknownTestMode(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_codes_round_trip_through_from_str() {
        for mode in TestMode::ALL {
            assert_eq!(mode.short_code().parse::<TestMode>().unwrap(), mode);
        }
        assert!("grill-only".parse::<TestMode>().is_err());
    }

    #[test]
    fn manual_grill_checks_grill_not_microwave() {
        let e = TestMode::ManualGrill.expectation();
        assert_eq!(e.microwave, Expectation::Unset);
        assert_eq!(e.grill.fixed(), Some(100.0));
    }

    #[test]
    fn variable_expectation_is_not_checkable() {
        assert_eq!(Expectation::Variable.fixed(), None);
        assert_eq!(Expectation::Unset.fixed(), None);
        assert_eq!(Expectation::Fixed(40.0).fixed(), Some(40.0));
    }

    #[test]
    fn combination_modes_forbid_overlap() {
        assert!(TestMode::CombinationC1.forbids_overlap());
        assert!(TestMode::Chicken.forbids_overlap());
        assert!(!TestMode::ManualGrill.forbids_overlap());
    }

    #[test]
    fn weight_ranges_are_inclusive() {
        let r = TestMode::Popcorn.weight_range().unwrap();
        assert!(r.contains(50.0));
        assert!(r.contains(150.0));
        assert!(!r.contains(151.0));
        assert!(!r.contains(f64::NAN));
        assert!(!TestMode::Normal.requires_weight());
    }
}
