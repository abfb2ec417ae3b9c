// src/acquisition/synthetic.rs
//! Deterministic synthetic EEG source
//!
//! Generates a sum of sinusoids per channel, optionally with seeded Gaussian-ish
//! noise and a slow amplitude modulation of chosen components. Two sources
//! built from equal configurations produce identical streams.

use crate::acquisition::source::{SampleChunk, SampleSource};
use crate::config::constants::acquisition;
use crate::error::{NeuroError, NeuroResult};
use async_trait::async_trait;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::time::Duration;
use tokio::time::Instant;

/// One sinusoidal component of the synthetic signal
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Oscillation {
    pub frequency_hz: f32,
    pub amplitude: f32,
    /// Optional slow modulation of this component's amplitude
    #[serde(default)]
    pub modulation: Option<Modulation>,
}

/// Amplitude envelope `1 + depth * sin(2π t / period)`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Modulation {
    pub period_s: f32,
    pub depth: f32,
}

/// Synthetic source configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SyntheticConfig {
    pub sample_rate_hz: f32,
    pub channel_count: usize,
    pub chunk_len: usize,
    pub oscillations: Vec<Oscillation>,
    pub noise_level: f32,
    pub seed: u64,
    /// Stop after this many seconds of signal; `None` runs forever
    pub duration_s: Option<f32>,
    /// Sleep for each chunk's duration before returning it
    pub realtime: bool,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: acquisition::DEFAULT_SYNTHETIC_SAMPLE_RATE_HZ,
            channel_count: 4,
            chunk_len: acquisition::DEFAULT_MAX_CHUNK_LEN,
            oscillations: vec![
                Oscillation { frequency_hz: 2.0, amplitude: 1.0, modulation: None },
                Oscillation { frequency_hz: 6.0, amplitude: 0.5, modulation: None },
                Oscillation {
                    frequency_hz: 10.0,
                    amplitude: 1.0,
                    modulation: Some(Modulation { period_s: 40.0, depth: 0.6 }),
                },
                Oscillation { frequency_hz: 20.0, amplitude: 0.3, modulation: None },
            ],
            noise_level: 0.05,
            seed: 42,
            duration_s: None,
            realtime: true,
        }
    }
}

impl SyntheticConfig {
    /// Pure tone at `frequency_hz`, no noise, no pacing
    pub fn tone(frequency_hz: f32, sample_rate_hz: f32, duration_s: f32) -> Self {
        Self {
            sample_rate_hz,
            channel_count: 1,
            oscillations: vec![Oscillation { frequency_hz, amplitude: 1.0, modulation: None }],
            noise_level: 0.0,
            duration_s: Some(duration_s),
            realtime: false,
            ..Self::default()
        }
    }

    /// Flat line at zero, no pacing
    pub fn flat(sample_rate_hz: f32, duration_s: f32) -> Self {
        Self {
            sample_rate_hz,
            channel_count: 1,
            oscillations: Vec::new(),
            noise_level: 0.0,
            duration_s: Some(duration_s),
            realtime: false,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> NeuroResult<()> {
        if !(self.sample_rate_hz > 0.0) {
            return Err(NeuroError::source_unavailable(
                "synthetic",
                format!("invalid sample rate {}", self.sample_rate_hz),
            ));
        }
        if self.channel_count == 0 || self.chunk_len == 0 {
            return Err(NeuroError::source_unavailable(
                "synthetic",
                "channel count and chunk length must be positive",
            ));
        }
        if self.noise_level < 0.0 {
            return Err(NeuroError::source_unavailable("synthetic", "noise level must be non-negative"));
        }
        Ok(())
    }
}

/// Synthetic EEG generator implementing [`SampleSource`]
pub struct SyntheticSource {
    config: SyntheticConfig,
    rng: StdRng,
    sample_index: u64,
    total_samples: Option<u64>,
    /// Release time of the chunk being paced, kept across cancelled pulls
    release_at: Option<Instant>,
}

impl SyntheticSource {
    /// Create a generator after validating its configuration
    pub fn new(config: SyntheticConfig) -> NeuroResult<Self> {
        config.validate()?;
        let total_samples = config
            .duration_s
            .map(|d| (d.max(0.0) as f64 * config.sample_rate_hz as f64).round() as u64);
        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            sample_index: 0,
            total_samples,
            release_at: None,
        })
    }

    pub fn config(&self) -> &SyntheticConfig {
        &self.config
    }

    fn generate_sample(&mut self) -> Vec<f32> {
        let t = self.sample_index as f64 / self.config.sample_rate_hz as f64;
        let clean: f64 = self
            .config
            .oscillations
            .iter()
            .map(|osc| {
                let envelope = osc.modulation.map_or(1.0, |m| {
                    1.0 + m.depth as f64 * (2.0 * PI * t / m.period_s as f64).sin()
                });
                osc.amplitude as f64 * envelope * (2.0 * PI * osc.frequency_hz as f64 * t).sin()
            })
            .sum();

        let noise_level = self.config.noise_level as f64;
        let mut channels = Vec::with_capacity(self.config.channel_count);
        for _ in 0..self.config.channel_count {
            let noise = if noise_level > 0.0 {
                // sum of uniforms: cheap approximately normal noise
                let s: f64 = (0..4).map(|_| self.rng.gen::<f64>() - 0.5).sum();
                s * noise_level
            } else {
                0.0
            };
            channels.push((clean + noise) as f32);
        }

        self.sample_index += 1;
        channels
    }
}

#[async_trait]
impl SampleSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn sample_rate_hz(&self) -> f32 {
        self.config.sample_rate_hz
    }

    async fn next_chunk(&mut self) -> NeuroResult<Option<SampleChunk>> {
        let remaining = match self.total_samples {
            Some(total) if self.sample_index >= total => return Ok(None),
            Some(total) => (total - self.sample_index) as usize,
            None => usize::MAX,
        };
        let n = self.config.chunk_len.min(remaining);

        if self.config.realtime {
            let secs = n as f64 / self.config.sample_rate_hz as f64;
            let release_at = *self
                .release_at
                .get_or_insert_with(|| Instant::now() + Duration::from_secs_f64(secs));
            tokio::time::sleep_until(release_at).await;
            self.release_at = None;
        }

        let channels = self.config.channel_count;
        let mut samples = Array2::zeros((n, channels));
        for mut row in samples.rows_mut() {
            let values = self.generate_sample();
            for (dst, src) in row.iter_mut().zip(values) {
                *dst = src;
            }
        }

        Ok(Some(SampleChunk::new(samples, self.config.sample_rate_hz)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn drain(mut source: SyntheticSource) -> Vec<f32> {
        let mut out = Vec::new();
        while let Some(chunk) = source.next_chunk().await.unwrap() {
            out.extend(chunk.samples.column(0).iter().copied());
        }
        out
    }

    #[tokio::test]
    async fn test_duration_bounds_stream() {
        let source = SyntheticSource::new(SyntheticConfig::tone(10.0, 100.0, 1.05)).unwrap();
        assert_eq!(drain(source).await.len(), 105);
    }

    #[tokio::test]
    async fn test_same_seed_same_stream() {
        let config = SyntheticConfig {
            duration_s: Some(2.0),
            realtime: false,
            ..SyntheticConfig::default()
        };
        let a = drain(SyntheticSource::new(config.clone()).unwrap()).await;
        let b = drain(SyntheticSource::new(config).unwrap()).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn test_flat_line_is_zero() {
        let samples = drain(SyntheticSource::new(SyntheticConfig::flat(64.0, 1.0)).unwrap()).await;
        assert!(samples.iter().all(|&v| v == 0.0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_pacing() {
        let config = SyntheticConfig {
            sample_rate_hz: 100.0,
            chunk_len: 50,
            realtime: true,
            duration_s: Some(1.0),
            ..SyntheticConfig::default()
        };
        let mut source = SyntheticSource::new(config).unwrap();
        let start = tokio::time::Instant::now();
        source.next_chunk().await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pull_survives_timeouts_shorter_than_chunk() {
        // 300 samples at 256 Hz take ~1.17 s to pace; each pull gives up after 0.5 s
        let config = SyntheticConfig {
            sample_rate_hz: 256.0,
            chunk_len: 300,
            realtime: true,
            duration_s: Some(10.0),
            ..SyntheticConfig::default()
        };
        let mut source = SyntheticSource::new(config).unwrap();

        let mut attempts = 0;
        let chunk = loop {
            attempts += 1;
            assert!(attempts <= 3, "pacing restarted on every pull");
            if let Ok(pulled) = tokio::time::timeout(Duration::from_millis(500), source.next_chunk()).await {
                break pulled.unwrap().unwrap();
            }
        };
        assert_eq!(chunk.len(), 300);
    }

    #[test]
    fn test_invalid_rate_is_source_unavailable() {
        let config = SyntheticConfig { sample_rate_hz: 0.0, ..SyntheticConfig::default() };
        match SyntheticSource::new(config) {
            Err(NeuroError::SourceUnavailable { .. }) => {}
            _ => panic!("expected SourceUnavailable"),
        }
    }
}
