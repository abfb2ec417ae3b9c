// src/config/mod.rs
//! Configuration surface for the neurofeedback pipeline
//!
//! All values are fixed at startup. Quantities that depend on the sample rate
//! of the acquisition collaborator (buffer sizes, history length) are derived
//! through [`NeurofeedbackConfig::geometry`] rather than configured directly.

pub mod constants;
pub mod loader;

pub use constants::*;
pub use loader::{ConfigError, ConfigLoader};

use serde::{Deserialize, Serialize};
use crate::processing::metric::MetricKind;

/// Complete pipeline configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct NeurofeedbackConfig {
    #[serde(default)]
    pub signal: SignalConfig,
    #[serde(default)]
    pub bands: BandConfig,
    #[serde(default)]
    pub metric: MetricConfig,
    #[serde(default)]
    pub baseline: BaselineConfig,
    #[serde(default)]
    pub event: EventConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub actuation: ActuationConfig,
}

/// Buffering, epoching and channel selection
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SignalConfig {
    #[serde(default = "defaults::buffer_length_s")]
    pub buffer_length_s: f32,

    #[serde(default = "defaults::epoch_length_s")]
    pub epoch_length_s: f32,

    #[serde(default = "defaults::overlap_length_s")]
    pub overlap_length_s: f32,

    #[serde(default = "defaults::channels")]
    pub channels: Vec<usize>,

    #[serde(default = "defaults::notch_enabled")]
    pub notch_enabled: bool,

    #[serde(default = "defaults::notch_frequency_hz")]
    pub notch_frequency_hz: f32,

    #[serde(default = "defaults::notch_q")]
    pub notch_q: f32,
}

/// Frequency band edges in Hz, `[low, high)`
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct BandConfig {
    #[serde(default = "defaults::delta")]
    pub delta: (f32, f32),
    #[serde(default = "defaults::theta")]
    pub theta: (f32, f32),
    #[serde(default = "defaults::alpha")]
    pub alpha: (f32, f32),
    #[serde(default = "defaults::beta")]
    pub beta: (f32, f32),
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MetricConfig {
    #[serde(default)]
    pub kind: MetricKind,

    #[serde(default = "defaults::degenerate_epsilon")]
    pub degenerate_epsilon: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BaselineConfig {
    #[serde(default = "defaults::drift_threshold")]
    pub drift_threshold: f32,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct EventConfig {
    #[serde(default = "defaults::bounds_width")]
    pub bounds_width: f32,

    #[serde(default = "defaults::cooldown_s")]
    pub cooldown_s: f32,

    /// Duration forwarded to the actuation collaborator with each event
    #[serde(default = "defaults::duration_ms")]
    pub duration_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AcquisitionConfig {
    #[serde(default = "defaults::poll_interval_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "defaults::pull_timeout_ms")]
    pub pull_timeout_ms: u64,

    #[serde(default = "defaults::max_chunk_len")]
    pub max_chunk_len: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ActuationConfig {
    #[serde(default = "defaults::endpoint")]
    pub endpoint: String,

    #[serde(default = "defaults::request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Default value providers using constants
mod defaults {
    use crate::config::constants::*;

    pub fn buffer_length_s() -> f32 { signal::DEFAULT_BUFFER_LENGTH_S }
    pub fn epoch_length_s() -> f32 { signal::DEFAULT_EPOCH_LENGTH_S }
    pub fn overlap_length_s() -> f32 { signal::DEFAULT_OVERLAP_LENGTH_S }
    pub fn channels() -> Vec<usize> { signal::DEFAULT_CHANNELS.to_vec() }
    pub fn notch_enabled() -> bool { true }
    pub fn notch_frequency_hz() -> f32 { filters::POWERLINE_FREQ_60HZ }
    pub fn notch_q() -> f32 { filters::DEFAULT_NOTCH_Q }

    pub fn delta() -> (f32, f32) { bands::DELTA_HZ }
    pub fn theta() -> (f32, f32) { bands::THETA_HZ }
    pub fn alpha() -> (f32, f32) { bands::ALPHA_HZ }
    pub fn beta() -> (f32, f32) { bands::BETA_HZ }

    pub fn degenerate_epsilon() -> f32 { metric::DEFAULT_DEGENERATE_EPSILON }

    pub fn drift_threshold() -> f32 { decision::DEFAULT_DRIFT_THRESHOLD }
    pub fn bounds_width() -> f32 { decision::DEFAULT_BOUNDS_WIDTH }
    pub fn cooldown_s() -> f32 { decision::DEFAULT_COOLDOWN_S }
    pub fn duration_ms() -> u64 { decision::DEFAULT_EVENT_DURATION_MS }

    pub fn poll_interval_ms() -> u64 { acquisition::DEFAULT_POLL_INTERVAL_MS }
    pub fn pull_timeout_ms() -> u64 { acquisition::DEFAULT_PULL_TIMEOUT_MS }
    pub fn max_chunk_len() -> usize { acquisition::DEFAULT_MAX_CHUNK_LEN }

    pub fn endpoint() -> String { actuation::DEFAULT_ENDPOINT.to_string() }
    pub fn request_timeout_ms() -> u64 { actuation::DEFAULT_REQUEST_TIMEOUT_MS }
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            buffer_length_s: defaults::buffer_length_s(),
            epoch_length_s: defaults::epoch_length_s(),
            overlap_length_s: defaults::overlap_length_s(),
            channels: defaults::channels(),
            notch_enabled: defaults::notch_enabled(),
            notch_frequency_hz: defaults::notch_frequency_hz(),
            notch_q: defaults::notch_q(),
        }
    }
}

impl Default for BandConfig {
    fn default() -> Self {
        Self {
            delta: defaults::delta(),
            theta: defaults::theta(),
            alpha: defaults::alpha(),
            beta: defaults::beta(),
        }
    }
}

impl BandConfig {
    /// Band edges in `[delta, theta, alpha, beta]` order
    pub fn as_array(&self) -> [(f32, f32); 4] {
        [self.delta, self.theta, self.alpha, self.beta]
    }
}

impl Default for MetricConfig {
    fn default() -> Self {
        Self {
            kind: MetricKind::default(),
            degenerate_epsilon: defaults::degenerate_epsilon(),
        }
    }
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self { drift_threshold: defaults::drift_threshold() }
    }
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            bounds_width: defaults::bounds_width(),
            cooldown_s: defaults::cooldown_s(),
            duration_ms: defaults::duration_ms(),
        }
    }
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: defaults::poll_interval_ms(),
            pull_timeout_ms: defaults::pull_timeout_ms(),
            max_chunk_len: defaults::max_chunk_len(),
        }
    }
}

impl Default for ActuationConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::endpoint(),
            request_timeout_ms: defaults::request_timeout_ms(),
        }
    }
}

/// Sample counts derived from the timing configuration and the source's sample rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PipelineGeometry {
    pub sample_rate_hz: f32,
    /// Capacity of the raw sample buffer
    pub buffer_samples: usize,
    /// Samples per analysis epoch
    pub epoch_samples: usize,
    /// Samples between consecutive epoch starts; also the max pull size
    pub shift_samples: usize,
    /// Number of band-power entries averaged for smoothing
    pub history_len: usize,
}

// Absorbs representation error in the seconds-valued inputs before flooring.
const FLOOR_TOLERANCE: f64 = 1e-6;

fn floor_count(value: f64) -> usize {
    (value + FLOOR_TOLERANCE).floor().max(0.0) as usize
}

impl NeurofeedbackConfig {
    /// Epoch shift in seconds
    pub fn shift_length_s(&self) -> f32 {
        self.signal.epoch_length_s - self.signal.overlap_length_s
    }

    /// Derive sample counts for a source running at `sample_rate_hz`
    pub fn geometry(&self, sample_rate_hz: f32) -> PipelineGeometry {
        let fs = sample_rate_hz as f64;
        let buffer = self.signal.buffer_length_s as f64;
        let epoch = self.signal.epoch_length_s as f64;
        let shift = self.shift_length_s() as f64;

        let history_len = if shift > 0.0 {
            floor_count((buffer - epoch) / shift + 1.0).max(1)
        } else {
            1
        };

        PipelineGeometry {
            sample_rate_hz,
            buffer_samples: floor_count(buffer * fs),
            epoch_samples: floor_count(epoch * fs),
            shift_samples: floor_count(shift * fs).max(1),
            history_len,
        }
    }

    /// Validate configuration consistency against the source's sample rate
    pub fn validate_consistency(&self, sample_rate_hz: f32) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if !(signal::MIN_SAMPLE_RATE_HZ..=signal::MAX_SAMPLE_RATE_HZ).contains(&sample_rate_hz) {
            errors.push(format!(
                "Sample rate {} Hz outside supported range {}..={} Hz",
                sample_rate_hz, signal::MIN_SAMPLE_RATE_HZ, signal::MAX_SAMPLE_RATE_HZ
            ));
        }

        let s = &self.signal;
        if s.epoch_length_s <= 0.0 {
            errors.push(format!("Epoch length must be positive, got {} s", s.epoch_length_s));
        }
        if s.epoch_length_s > s.buffer_length_s {
            errors.push(format!(
                "Epoch length ({} s) must not exceed buffer length ({} s)",
                s.epoch_length_s, s.buffer_length_s
            ));
        }
        if self.shift_length_s() <= 0.0 {
            errors.push(format!(
                "Overlap ({} s) must be shorter than the epoch ({} s)",
                s.overlap_length_s, s.epoch_length_s
            ));
        }
        if s.channels.is_empty() {
            errors.push("At least one channel must be selected".to_string());
        }
        if s.channels.iter().any(|&ch| ch >= signal::MAX_CHANNEL_COUNT) {
            errors.push(format!("Channel indices must be below {}", signal::MAX_CHANNEL_COUNT));
        }

        let nyquist = sample_rate_hz / 2.0;
        if s.notch_enabled {
            if s.notch_frequency_hz <= 0.0 || s.notch_frequency_hz >= nyquist {
                errors.push(format!(
                    "Notch frequency ({} Hz) must be within (0, {}) Hz",
                    s.notch_frequency_hz, nyquist
                ));
            }
            if s.notch_q < filters::MIN_NOTCH_Q {
                errors.push(format!("Notch Q ({}) must be at least {}", s.notch_q, filters::MIN_NOTCH_Q));
            }
        }

        let names = ["delta", "theta", "alpha", "beta"];
        let edges = self.bands.as_array();
        for (name, (low, high)) in names.iter().zip(edges.iter()) {
            if low < &0.0 || low >= high {
                errors.push(format!("Band {} has invalid edges [{}, {})", name, low, high));
            }
            if *high > nyquist {
                errors.push(format!(
                    "Band {} upper edge ({} Hz) exceeds Nyquist frequency ({} Hz)",
                    name, high, nyquist
                ));
            }
        }
        for (i, pair) in edges.windows(2).enumerate() {
            if pair[0].1 > pair[1].0 {
                errors.push(format!("Bands {} and {} overlap", names[i], names[i + 1]));
            }
        }

        if self.metric.degenerate_epsilon < 0.0 {
            errors.push("Degenerate epsilon must be non-negative".to_string());
        }
        if self.baseline.drift_threshold < 0.0 {
            errors.push("Drift threshold must be non-negative".to_string());
        }
        if self.event.bounds_width < 0.0 {
            errors.push("Bounds width must be non-negative".to_string());
        }
        if self.event.cooldown_s < 0.0 || !self.event.cooldown_s.is_finite() {
            errors.push(format!("Cooldown must be a finite non-negative duration, got {}", self.event.cooldown_s));
        }
        if self.acquisition.max_chunk_len == 0 {
            errors.push("Max chunk length must be positive".to_string());
        }

        if errors.is_empty() {
            let geometry = self.geometry(sample_rate_hz);
            if geometry.epoch_samples < 2 {
                errors.push(format!(
                    "Epoch of {} s at {} Hz holds fewer than 2 samples",
                    s.epoch_length_s, sample_rate_hz
                ));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Get configuration summary
    pub fn get_summary(&self, sample_rate_hz: f32) -> ConfigSummary {
        ConfigSummary {
            geometry: self.geometry(sample_rate_hz),
            channels: self.signal.channels.clone(),
            metric: self.metric.kind,
            drift_threshold: self.baseline.drift_threshold,
            bounds_width: self.event.bounds_width,
            cooldown_s: self.event.cooldown_s,
        }
    }
}

/// Configuration summary for display/logging
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSummary {
    pub geometry: PipelineGeometry,
    pub channels: Vec<usize>,
    pub metric: MetricKind,
    pub drift_threshold: f32,
    pub bounds_width: f32,
    pub cooldown_s: f32,
}
