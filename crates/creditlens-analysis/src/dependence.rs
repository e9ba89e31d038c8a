//! Dependence of a numeric feature's attribution on its raw value.
//!
//! For a numeric feature, pairing each sampled raw value with the feature's
//! grouped attribution shows how the model uses the feature:
//!
//! - **Correlation** - Pearson correlation of value and attribution; absent
//!   when either side is constant
//! - **Bands** - mean attribution for values `≤ Q25`, in `(Q25, Q75]` and
//!   `> Q75`
//! - **Nonlinearity** - the mid band deviates from the average of the outer
//!   bands by more than a threshold
//!
//! The nonlinearity flag is a band-average heuristic, not a fitted
//! functional form: a monotone but curved response can pass unflagged, and
//! a noisy linear response with a small threshold can be flagged.

use creditlens_stats::{bands::BandSummary, correlation::pearson};
use serde::{Deserialize, Serialize};

/// Plain-language shape of a value/attribution relationship.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
    derive_more::IsVariant,
)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    #[display("nonlinear")]
    Nonlinear,
    #[display("increases with value")]
    IncreasesWithValue,
    #[display("decreases with value")]
    DecreasesWithValue,
    #[display("no clear trend")]
    NoClearTrend,
}

/// Thresholds of the dependence analysis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DependenceThresholds {
    /// Minimum mid-band deviation flagged as nonlinear.
    pub nonlinearity: f64,
    /// Minimum `|r|` reported as a trend.
    pub trend: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependenceInsight {
    pub feature: String,
    pub display_name: String,
    pub correlation: Option<f64>,
    pub q25: f64,
    pub q50: f64,
    pub q75: f64,
    pub attribution_at_low: Option<f64>,
    pub attribution_at_mid: Option<f64>,
    pub attribution_at_high: Option<f64>,
    pub is_nonlinear: bool,
    pub relationship: Relationship,
}

impl DependenceInsight {
    /// Analyzes paired raw `values` and `attributions` of one feature.
    ///
    /// Returns `None` when the inputs are empty or have different lengths.
    ///
    /// ```
    /// use creditlens_analysis::dependence::{DependenceInsight, DependenceThresholds, Relationship};
    ///
    /// let values = (0..100).map(f64::from).collect::<Vec<_>>();
    /// let attributions = values.iter().map(|v| 0.002 * v - 0.1).collect::<Vec<_>>();
    /// let thresholds = DependenceThresholds { nonlinearity: 0.01, trend: 0.1 };
    ///
    /// let insight =
    ///     DependenceInsight::analyze("age", "Age", &values, &attributions, thresholds).unwrap();
    /// assert!(!insight.is_nonlinear);
    /// assert_eq!(insight.relationship, Relationship::IncreasesWithValue);
    /// ```
    #[must_use]
    pub fn analyze(
        feature: &str,
        display_name: &str,
        values: &[f64],
        attributions: &[f64],
        thresholds: DependenceThresholds,
    ) -> Option<Self> {
        let bands = BandSummary::new(values, attributions)?;
        let correlation = pearson(values, attributions);
        let is_nonlinear = bands
            .mid_deviation()
            .is_some_and(|deviation| deviation > thresholds.nonlinearity);
        let relationship = if is_nonlinear {
            Relationship::Nonlinear
        } else {
            match correlation {
                Some(r) if r >= thresholds.trend => Relationship::IncreasesWithValue,
                Some(r) if r <= -thresholds.trend => Relationship::DecreasesWithValue,
                _ => Relationship::NoClearTrend,
            }
        };
        Some(Self {
            feature: feature.to_owned(),
            display_name: display_name.to_owned(),
            correlation,
            q25: bands.q25,
            q50: bands.q50,
            q75: bands.q75,
            attribution_at_low: bands.low_mean,
            attribution_at_mid: bands.mid_mean,
            attribution_at_high: bands.high_mean,
            is_nonlinear,
            relationship,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const THRESHOLDS: DependenceThresholds = DependenceThresholds {
        nonlinearity: 0.01,
        trend: 0.1,
    };

    fn values() -> Vec<f64> {
        (0..100).map(f64::from).collect()
    }

    #[test]
    fn test_constant_attribution_is_not_nonlinear() {
        let values = values();
        let attributions = vec![0.3; values.len()];
        let insight =
            DependenceInsight::analyze("x", "X", &values, &attributions, THRESHOLDS).unwrap();
        assert!(!insight.is_nonlinear);
        assert_eq!(insight.correlation, None);
        assert_eq!(insight.relationship, Relationship::NoClearTrend);
    }

    #[test]
    fn test_mid_band_only_attribution_is_nonlinear() {
        let values = values();
        let attributions = values
            .iter()
            .map(|v| if *v > 24.75 && *v <= 74.25 { 0.5 } else { 0.0 })
            .collect::<Vec<_>>();
        let insight =
            DependenceInsight::analyze("x", "X", &values, &attributions, THRESHOLDS).unwrap();
        assert!(insight.is_nonlinear);
        assert_eq!(insight.relationship, Relationship::Nonlinear);
        assert_eq!(insight.attribution_at_low, Some(0.0));
        assert_eq!(insight.attribution_at_mid, Some(0.5));
    }

    #[test]
    fn test_threshold_is_strict() {
        let values = values();
        // mid band sits exactly at the threshold above the outer bands
        let attributions = values
            .iter()
            .map(|v| if *v > 24.75 && *v <= 74.25 { 0.25 } else { 0.0 })
            .collect::<Vec<_>>();
        let at = DependenceThresholds {
            nonlinearity: 0.25,
            trend: 0.1,
        };
        let insight = DependenceInsight::analyze("x", "X", &values, &attributions, at).unwrap();
        assert!(!insight.is_nonlinear);
        let below = DependenceThresholds {
            nonlinearity: 0.24,
            trend: 0.1,
        };
        let insight = DependenceInsight::analyze("x", "X", &values, &attributions, below).unwrap();
        assert!(insight.is_nonlinear);
    }

    #[test]
    fn test_decreasing_trend() {
        let values = values();
        let attributions = values.iter().map(|v| -0.01 * v).collect::<Vec<_>>();
        let insight =
            DependenceInsight::analyze("x", "X", &values, &attributions, THRESHOLDS).unwrap();
        assert!(!insight.is_nonlinear);
        assert!(insight.correlation.unwrap() < -0.99);
        assert_eq!(insight.relationship, Relationship::DecreasesWithValue);
    }

    #[test]
    fn test_constant_values_leave_bands_empty() {
        let insight =
            DependenceInsight::analyze("x", "X", &[5.0; 10], &[0.1; 10], THRESHOLDS).unwrap();
        assert_eq!(insight.attribution_at_mid, None);
        assert!(!insight.is_nonlinear);
        assert_eq!(insight.correlation, None);
    }
}
