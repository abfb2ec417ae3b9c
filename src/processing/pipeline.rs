// src/processing/pipeline.rs
//! Per-chunk signal processing: buffer, epoch, band powers, smoothing,
//! metric and baseline

use crate::acquisition::sample_buffer::{EpochExtractor, SampleBuffer};
use crate::config::{NeurofeedbackConfig, PipelineGeometry};
use crate::error::{NeuroError, NeuroErrorBuilder, NeuroResult};
use crate::processing::bandpower::{BandPowerEstimator, BandPowers};
use crate::processing::baseline::BaselineTracker;
use crate::processing::metric::MetricKind;
use crate::processing::smoothing::{BandPowerHistory, SmoothedBandPowers};
use crate::utils::time::{MonotonicTimeProvider, TimeProvider};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Everything computed in one evaluated cycle
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MetricReading {
    pub band_powers: BandPowers,
    pub smoothed: SmoothedBandPowers,
    pub metric: f32,
    pub baseline: f32,
    pub rebased: bool,
}

/// Result of feeding one chunk through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Buffer does not yet hold a full epoch
    Warming { required: usize, available: usize },
    /// Metric was not finite; baseline and gate must be skipped
    Degenerate {
        smoothed: SmoothedBandPowers,
        numerator: f32,
        denominator: f32,
    },
    Evaluated(MetricReading),
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct PerformanceMetrics {
    pub cycles: u64,
    pub warming_cycles: u64,
    pub degenerate_cycles: u64,
    pub average_processing_time_us: f32,
    pub max_processing_time_us: f32,
}

/// Owns all per-stream state: sample buffer, filter state, band-power
/// history and baseline
pub struct SignalPipeline {
    buffer: SampleBuffer,
    extractor: EpochExtractor,
    estimator: BandPowerEstimator,
    history: BandPowerHistory,
    baseline: BaselineTracker,
    metric: MetricKind,
    degenerate_epsilon: f32,
    geometry: PipelineGeometry,
    time_provider: Arc<dyn TimeProvider>,
    performance_metrics: PerformanceMetrics,
}

impl SignalPipeline {
    pub fn new(
        config: &NeurofeedbackConfig,
        sample_rate_hz: f32,
        time_provider: Arc<dyn TimeProvider>,
    ) -> NeuroResult<Self> {
        config.validate_consistency(sample_rate_hz).map_err(|errors| {
            NeuroErrorBuilder::new("pipeline", "new").configuration(&errors.join("; "))
        })?;

        let geometry = config.geometry(sample_rate_hz);
        debug!(?geometry, "pipeline geometry");

        Ok(Self {
            buffer: SampleBuffer::from_config(&config.signal, &geometry)?,
            extractor: EpochExtractor::new(geometry.epoch_samples),
            estimator: BandPowerEstimator::new(sample_rate_hz, geometry.epoch_samples, &config.bands)?,
            history: BandPowerHistory::new(geometry.history_len)?,
            baseline: BaselineTracker::new(config.baseline.drift_threshold),
            metric: config.metric.kind,
            degenerate_epsilon: config.metric.degenerate_epsilon,
            geometry,
            time_provider,
            performance_metrics: PerformanceMetrics::default(),
        })
    }

    /// Build with a monotonic clock
    pub fn from_config(config: &NeurofeedbackConfig, sample_rate_hz: f32) -> NeuroResult<Self> {
        Self::new(config, sample_rate_hz, Arc::new(MonotonicTimeProvider::new()))
    }

    /// Run one processing cycle over the selected-channel samples of a chunk
    pub fn process_chunk(&mut self, samples: &[Vec<f32>]) -> NeuroResult<CycleOutcome> {
        let start_time = self.time_provider.now_nanos();
        let outcome = self.run_cycle(samples);
        let end_time = self.time_provider.now_nanos();

        if let Ok(outcome) = &outcome {
            let processing_time_us = end_time.saturating_sub(start_time) as f32 / 1000.0;
            self.update_performance_metrics(outcome, processing_time_us);
        }
        outcome
    }

    fn run_cycle(&mut self, samples: &[Vec<f32>]) -> NeuroResult<CycleOutcome> {
        self.buffer.update(samples)?;

        let epoch = match self.extractor.latest(&self.buffer) {
            Ok(epoch) => epoch,
            Err(NeuroError::InsufficientData { required, available, .. }) => {
                return Ok(CycleOutcome::Warming { required, available });
            }
            Err(e) => return Err(e),
        };

        let band_powers = self.estimator.compute(&epoch)?;
        let smoothed = self.history.push(band_powers);

        let metric = match self.metric.derive(&smoothed, self.degenerate_epsilon) {
            Ok(value) => value,
            Err(NeuroError::DegenerateMetric { numerator, denominator, .. }) => {
                return Ok(CycleOutcome::Degenerate { smoothed, numerator, denominator });
            }
            Err(e) => return Err(e),
        };

        let update = self.baseline.observe(metric);
        debug!(
            metric,
            baseline = update.baseline,
            rebased = update.rebased,
            %smoothed,
            "cycle evaluated"
        );

        Ok(CycleOutcome::Evaluated(MetricReading {
            band_powers,
            smoothed,
            metric,
            baseline: update.baseline,
            rebased: update.rebased,
        }))
    }

    pub fn geometry(&self) -> &PipelineGeometry {
        &self.geometry
    }

    pub fn metric_kind(&self) -> MetricKind {
        self.metric
    }

    pub fn baseline(&self) -> Option<f32> {
        self.baseline.baseline()
    }

    pub fn rebase_count(&self) -> u64 {
        self.baseline.rebase_count()
    }

    pub fn buffer(&self) -> &SampleBuffer {
        &self.buffer
    }

    pub fn history(&self) -> &BandPowerHistory {
        &self.history
    }

    /// Get current performance metrics
    pub fn get_performance_metrics(&self) -> &PerformanceMetrics {
        &self.performance_metrics
    }

    /// Reset performance metrics
    pub fn reset_metrics(&mut self) {
        self.performance_metrics = PerformanceMetrics::default();
    }

    fn update_performance_metrics(&mut self, outcome: &CycleOutcome, processing_time_us: f32) {
        let metrics = &mut self.performance_metrics;
        metrics.cycles += 1;
        match outcome {
            CycleOutcome::Warming { .. } => metrics.warming_cycles += 1,
            CycleOutcome::Degenerate { .. } => metrics.degenerate_cycles += 1,
            CycleOutcome::Evaluated(_) => {}
        }

        let n = metrics.cycles as f32;
        metrics.average_processing_time_us =
            (metrics.average_processing_time_us * (n - 1.0) + processing_time_us) / n;

        if processing_time_us > metrics.max_processing_time_us {
            metrics.max_processing_time_us = processing_time_us;
        }
    }
}
