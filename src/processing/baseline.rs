// src/processing/baseline.rs
//! Adaptive baseline with hard re-anchoring

use tracing::info;

/// Result of one [`BaselineTracker::observe`] call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaselineUpdate {
    pub baseline: f32,
    pub rebased: bool,
}

/// Single reference value for the metric
///
/// The first observation sets the baseline. Afterwards any metric strictly
/// outside `[baseline - drift, baseline + drift]` replaces the baseline
/// outright; there is no averaging.
#[derive(Debug, Clone)]
pub struct BaselineTracker {
    baseline: Option<f32>,
    drift_threshold: f32,
    rebase_count: u64,
}

impl BaselineTracker {
    pub fn new(drift_threshold: f32) -> Self {
        Self {
            baseline: None,
            drift_threshold,
            rebase_count: 0,
        }
    }

    pub fn observe(&mut self, metric: f32) -> BaselineUpdate {
        let Some(baseline) = self.baseline else {
            info!(baseline = metric, "baseline initialised");
            self.baseline = Some(metric);
            return BaselineUpdate { baseline: metric, rebased: false };
        };

        if metric > baseline + self.drift_threshold || metric < baseline - self.drift_threshold {
            info!(old = baseline, new = metric, "baseline re-anchored");
            self.baseline = Some(metric);
            self.rebase_count += 1;
            return BaselineUpdate { baseline: metric, rebased: true };
        }

        BaselineUpdate { baseline, rebased: false }
    }

    /// Current baseline, `None` before the first observation
    pub fn baseline(&self) -> Option<f32> {
        self.baseline
    }

    pub fn drift_threshold(&self) -> f32 {
        self.drift_threshold
    }

    pub fn rebase_count(&self) -> u64 {
        self.rebase_count
    }
}
