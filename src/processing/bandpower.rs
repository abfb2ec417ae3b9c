// src/processing/bandpower.rs
//! Spectral band power estimation for one epoch
//!
//! Each channel is mean-centred, Hamming-windowed, zero-padded to the next
//! power of two and transformed with a forward FFT. The one-sided amplitude
//! spectrum `2·|Y[k]| / N` is then averaged over the bins of each band.
//! Channels are averaged into a single [`BandPowers`].

use crate::acquisition::sample_buffer::Epoch;
use crate::config::BandConfig;
use crate::error::{NeuroErrorBuilder, NeuroResult, ProcessingStage};
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use serde::Serialize;
use std::f32::consts::PI;
use std::fmt;
use std::sync::Arc;

/// Peak-to-peak spread, in f32 ulps of the channel level, still treated as flat
const FLAT_TOLERANCE_ULPS: f32 = 4.0;

/// EEG frequency bands, in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Delta = 0,
    Theta = 1,
    Alpha = 2,
    Beta = 3,
}

impl Band {
    pub const ALL: [Band; 4] = [Band::Delta, Band::Theta, Band::Alpha, Band::Beta];

    pub fn name(self) -> &'static str {
        match self {
            Band::Delta => "delta",
            Band::Theta => "theta",
            Band::Alpha => "alpha",
            Band::Beta => "beta",
        }
    }
}

/// Non-negative power per band: `[delta, theta, alpha, beta]`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BandPowers(pub [f32; 4]);

impl BandPowers {
    pub fn new(delta: f32, theta: f32, alpha: f32, beta: f32) -> Self {
        Self([delta, theta, alpha, beta])
    }

    pub fn get(&self, band: Band) -> f32 {
        self.0[band as usize]
    }

    pub fn delta(&self) -> f32 {
        self.get(Band::Delta)
    }

    pub fn theta(&self) -> f32 {
        self.get(Band::Theta)
    }

    pub fn alpha(&self) -> f32 {
        self.get(Band::Alpha)
    }

    pub fn beta(&self) -> f32 {
        self.get(Band::Beta)
    }

    /// Band holding the most power; ties resolve to the lower band
    pub fn dominant(&self) -> Band {
        Band::ALL
            .iter()
            .copied()
            .fold(Band::Delta, |best, b| if self.get(b) > self.get(best) { b } else { best })
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&v| v == 0.0)
    }
}

impl fmt::Display for BandPowers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "delta={:.4} theta={:.4} alpha={:.4} beta={:.4}",
            self.delta(), self.theta(), self.alpha(), self.beta()
        )
    }
}

/// Half-open range of FFT bins belonging to one band
#[derive(Debug, Clone, Copy, PartialEq)]
struct BinRange {
    start: usize,
    end: usize,
}

/// Converts an [`Epoch`] into [`BandPowers`]
pub struct BandPowerEstimator {
    epoch_samples: usize,
    fft_size: usize,
    window_function: Vec<f32>,
    bins: [BinRange; 4],
    fft: Arc<dyn Fft<f32>>,
}

impl BandPowerEstimator {
    pub fn new(sample_rate_hz: f32, epoch_samples: usize, bands: &BandConfig) -> NeuroResult<Self> {
        if epoch_samples < 2 {
            return Err(NeuroErrorBuilder::new("band_power", "new")
                .configuration("epoch must hold at least 2 samples"));
        }

        let fft_size = epoch_samples.next_power_of_two();
        let resolution = sample_rate_hz / fft_size as f32;
        let one_sided = fft_size / 2;

        let edges = bands.as_array();
        let mut bins = [BinRange { start: 0, end: 0 }; 4];
        for (range, &(low, high)) in bins.iter_mut().zip(edges.iter()) {
            // bin k sits at k * resolution; keep bins with low <= f < high
            let start = (low / resolution).ceil() as usize;
            let end = ((high / resolution).ceil() as usize).min(one_sided);
            if start >= end {
                return Err(NeuroErrorBuilder::new("band_power", "new").configuration(&format!(
                    "band [{}, {}) Hz contains no FFT bins at {} Hz resolution",
                    low, high, resolution
                )));
            }
            *range = BinRange { start, end };
        }

        let fft = FftPlanner::<f32>::new().plan_fft_forward(fft_size);

        Ok(Self {
            epoch_samples,
            fft_size,
            window_function: Self::create_hamming_window(epoch_samples),
            bins,
            fft,
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Compute band powers for every channel of `epoch` and average them
    pub fn compute(&self, epoch: &Epoch) -> NeuroResult<BandPowers> {
        if epoch.sample_count() != self.epoch_samples {
            return Err(NeuroErrorBuilder::new("band_power", "compute").processing(
                ProcessingStage::BandPower,
                &format!("epoch has {} samples, expected {}", epoch.sample_count(), self.epoch_samples),
            ));
        }
        if epoch.channel_count() == 0 {
            return Err(NeuroErrorBuilder::new("band_power", "compute")
                .processing(ProcessingStage::BandPower, "epoch has no channels"));
        }

        let mut total = [0.0f32; 4];
        for column in epoch.data().columns() {
            let channel: Vec<f32> = column.to_vec();
            let powers = self.channel_band_powers(&channel);
            for (acc, p) in total.iter_mut().zip(powers.iter()) {
                *acc += p;
            }
        }

        let n = epoch.channel_count() as f32;
        Ok(BandPowers(total.map(|v| v / n)))
    }

    fn channel_band_powers(&self, channel: &[f32]) -> [f32; 4] {
        // a channel flat to within f32 rounding of its level has no spectral
        // content; skip the FFT so the residue cannot pass for band power
        let (min, max) = channel
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let level = min.abs().max(max.abs());
        if max - min <= FLAT_TOLERANCE_ULPS * f32::EPSILON * level {
            return [0.0; 4];
        }

        let spectrum = self.amplitude_spectrum(channel);
        let mut powers = [0.0f32; 4];
        for (power, range) in powers.iter_mut().zip(self.bins.iter()) {
            let bins = &spectrum[range.start..range.end];
            *power = bins.iter().sum::<f32>() / bins.len() as f32;
        }
        powers
    }

    fn amplitude_spectrum(&self, channel: &[f32]) -> Vec<f32> {
        let mean = (channel.iter().map(|&v| v as f64).sum::<f64>() / channel.len() as f64) as f32;

        let mut buffer: Vec<Complex<f32>> = channel
            .iter()
            .zip(self.window_function.iter())
            .map(|(&x, &w)| Complex::new((x - mean) * w, 0.0))
            .collect();
        buffer.resize(self.fft_size, Complex::new(0.0, 0.0));

        self.fft.process(&mut buffer);

        let scale = 2.0 / self.epoch_samples as f32;
        buffer[..self.fft_size / 2]
            .iter()
            .map(|c| c.norm() * scale)
            .collect()
    }

    fn create_hamming_window(size: usize) -> Vec<f32> {
        (0..size)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f32 / (size - 1) as f32).cos())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine_epoch(freqs: &[(f32, f32)], sample_rate: f32, n: usize) -> Epoch {
        let samples: Vec<f32> = (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate;
                freqs.iter().map(|&(f, a)| a * (2.0 * PI * f * t).sin()).sum()
            })
            .collect();
        Epoch::from_channel(&samples)
    }

    fn estimator() -> BandPowerEstimator {
        BandPowerEstimator::new(256.0, 256, &BandConfig::default()).unwrap()
    }

    #[test]
    fn test_alpha_tone_dominates() {
        let powers = estimator().compute(&sine_epoch(&[(10.0, 1.0)], 256.0, 256)).unwrap();
        assert_eq!(powers.dominant(), Band::Alpha);
        assert!(powers.alpha() > powers.delta());
        assert!(powers.alpha() > powers.theta());
        assert!(powers.alpha() > powers.beta());
    }

    #[test]
    fn test_each_band_detected() {
        let est = estimator();
        for (freq, band) in [(2.0, Band::Delta), (6.0, Band::Theta), (10.0, Band::Alpha), (20.0, Band::Beta)] {
            let powers = est.compute(&sine_epoch(&[(freq, 1.0)], 256.0, 256)).unwrap();
            assert_eq!(powers.dominant(), band, "{} Hz -> {}", freq, powers);
        }
    }

    #[test]
    fn test_flat_epoch_is_all_zero() {
        let est = estimator();
        assert!(est.compute(&Epoch::from_channel(&[0.0; 256])).unwrap().is_zero());
        assert!(est.compute(&Epoch::from_channel(&[0.3; 256])).unwrap().is_zero());
    }

    #[test]
    fn test_rounding_residue_on_offset_is_flat() {
        let ulp = 0.3f32 * f32::EPSILON;
        let samples: Vec<f32> = (0..256).map(|i| if i % 3 == 0 { 0.3 + ulp } else { 0.3 }).collect();
        assert!(estimator().compute(&Epoch::from_channel(&samples)).unwrap().is_zero());

        // a real, small oscillation on the same offset is not flattened
        let wave: Vec<f32> = sine_epoch(&[(10.0, 1e-3)], 256.0, 256)
            .data()
            .column(0)
            .iter()
            .map(|v| v + 0.3)
            .collect();
        assert!(!estimator().compute(&Epoch::from_channel(&wave)).unwrap().is_zero());
    }

    #[test]
    fn test_deterministic() {
        let est = estimator();
        let epoch = sine_epoch(&[(10.0, 1.0), (3.0, 0.5)], 256.0, 256);
        assert_eq!(est.compute(&epoch).unwrap(), est.compute(&epoch).unwrap());
    }

    #[test]
    fn test_non_power_of_two_epoch() {
        let est = BandPowerEstimator::new(250.0, 250, &BandConfig::default()).unwrap();
        assert_eq!(est.fft_size(), 256);
        let powers = est.compute(&sine_epoch(&[(10.0, 1.0)], 250.0, 250)).unwrap();
        assert_eq!(powers.dominant(), Band::Alpha);
    }

    #[test]
    fn test_channels_averaged() {
        let est = estimator();
        let a = sine_epoch(&[(10.0, 1.0)], 256.0, 256);
        let single = est.compute(&a).unwrap();

        let mut data = ndarray::Array2::zeros((256, 2));
        data.column_mut(0).assign(&a.data().column(0));
        let both = est.compute(&Epoch::new(data)).unwrap();

        assert!((both.alpha() - single.alpha() / 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_epoch_length_rejected() {
        assert!(estimator().compute(&Epoch::from_channel(&[1.0; 100])).is_err());
    }

    #[test]
    fn test_band_without_bins_rejected() {
        let bands = BandConfig { alpha: (8.2, 8.9), ..BandConfig::default() };
        assert!(BandPowerEstimator::new(256.0, 256, &bands).is_err());
    }
}
