// src/processing/metric.rs
//! Neurofeedback metrics derived from smoothed band powers

use crate::error::{NeuroErrorBuilder, NeuroResult};
use crate::processing::bandpower::{Band, BandPowers};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ratio of two band powers used as the feedback signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// alpha / delta: relaxation, with delta normalising out movement noise
    #[default]
    AlphaRelaxation,
    /// beta / theta: concentration, common in ADHD protocols
    BetaConcentration,
    /// theta / alpha: deep relaxation, associated with reduced anxiety
    ThetaRelaxation,
}

impl MetricKind {
    /// `(numerator, denominator)` bands
    pub fn bands(self) -> (Band, Band) {
        match self {
            MetricKind::AlphaRelaxation => (Band::Alpha, Band::Delta),
            MetricKind::BetaConcentration => (Band::Beta, Band::Theta),
            MetricKind::ThetaRelaxation => (Band::Theta, Band::Alpha),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            MetricKind::AlphaRelaxation => "alpha_relaxation",
            MetricKind::BetaConcentration => "beta_concentration",
            MetricKind::ThetaRelaxation => "theta_relaxation",
        }
    }

    /// Compute the ratio, failing with `DegenerateMetric` when it is not finite
    ///
    /// A denominator at or below `epsilon` counts as zero.
    pub fn derive(self, smoothed: &BandPowers, epsilon: f32) -> NeuroResult<f32> {
        let (num_band, den_band) = self.bands();
        let numerator = smoothed.get(num_band);
        let denominator = smoothed.get(den_band);

        let value = numerator / denominator;
        if denominator.abs() <= epsilon || !value.is_finite() {
            return Err(NeuroErrorBuilder::new("metric", "derive")
                .degenerate_metric(self.name(), numerator, denominator));
        }
        Ok(value)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NeuroError;

    #[test]
    fn test_alpha_relaxation_ratio() {
        let powers = BandPowers::new(2.0, 1.0, 3.0, 0.5);
        assert_eq!(MetricKind::AlphaRelaxation.derive(&powers, 1e-12).unwrap(), 1.5);
        assert_eq!(MetricKind::BetaConcentration.derive(&powers, 1e-12).unwrap(), 0.5);
        assert!((MetricKind::ThetaRelaxation.derive(&powers, 1e-12).unwrap() - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_zero_delta_is_degenerate() {
        let powers = BandPowers::new(0.0, 1.0, 3.0, 0.5);
        match MetricKind::AlphaRelaxation.derive(&powers, 1e-12) {
            Err(NeuroError::DegenerateMetric { metric, denominator, .. }) => {
                assert_eq!(metric, "alpha_relaxation");
                assert_eq!(denominator, 0.0);
            }
            other => panic!("expected DegenerateMetric, got {:?}", other),
        }
    }

    #[test]
    fn test_all_zero_is_degenerate() {
        assert!(MetricKind::AlphaRelaxation.derive(&BandPowers::default(), 0.0).is_err());
    }

    #[test]
    fn test_near_zero_denominator_is_degenerate() {
        let powers = BandPowers::new(1e-14, 0.0, 1.0, 0.0);
        assert!(MetricKind::AlphaRelaxation.derive(&powers, 1e-12).is_err());
    }

    #[test]
    fn test_serde_names() {
        let kind: MetricKind = serde_json::from_str("\"theta_relaxation\"").unwrap();
        assert_eq!(kind, MetricKind::ThetaRelaxation);
        assert_eq!(MetricKind::default(), MetricKind::AlphaRelaxation);
    }
}
