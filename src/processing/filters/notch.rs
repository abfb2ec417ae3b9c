// src/processing/filters/notch.rs
//! Powerline notch filter with persistent per-channel state
//!
//! Coefficients are shared across channels; each channel keeps its own delay
//! line so that filtering is continuous across successive chunks. Arithmetic
//! runs in f64 and each channel's delay line starts at its first sample, so a
//! constant input comes out bit-identical.

use super::FilterError;
use std::f64::consts::PI;

/// Biquad notch coefficients, normalised so that `a0 == 1`
#[derive(Debug, Clone, Copy, PartialEq)]
struct NotchCoefficients {
    b0: f64, b1: f64, b2: f64,
    a1: f64, a2: f64,
}

impl NotchCoefficients {
    fn design(center_freq: f32, q_factor: f32, sample_rate: f32) -> Self {
        let (center_freq, q_factor, sample_rate) = (center_freq as f64, q_factor as f64, sample_rate as f64);
        let omega = 2.0 * PI * center_freq / sample_rate;
        let cos_omega = omega.cos();
        let alpha = omega.sin() / (2.0 * q_factor);

        let norm = 1.0 + alpha;

        Self {
            b0: 1.0 / norm,
            b1: -2.0 * cos_omega / norm,
            b2: 1.0 / norm,
            a1: -2.0 * cos_omega / norm,
            a2: (1.0 - alpha) / norm,
        }
    }
}

/// Delay line of one biquad section: `[x1, x2, y1, y2]`
type SectionState = [f64; 4];

/// Opaque filter state carried between buffer updates
#[derive(Debug, Clone, PartialEq)]
pub struct FilterState {
    // channel -> section -> delay line
    channels: Vec<Vec<SectionState>>,
    primed: Vec<bool>,
}

impl FilterState {
    fn zeroed(channel_count: usize, section_count: usize) -> Self {
        Self {
            channels: vec![vec![[0.0; 4]; section_count]; channel_count],
            primed: vec![false; channel_count],
        }
    }

    /// True until the first sample passes through the filter
    pub fn is_initial(&self) -> bool {
        !self.primed.iter().any(|&p| p)
    }
}

/// Notch filter for powerline interference and its harmonics
#[derive(Debug, Clone)]
pub struct PowerLineNotchFilter {
    sections: Vec<NotchCoefficients>,
    state: FilterState,
    fundamental_freq: f32,
}

impl PowerLineNotchFilter {
    /// Create a notch at `fundamental_freq` plus harmonics up to `max_harmonic`
    ///
    /// Harmonics at or above Nyquist are skipped.
    pub fn new(
        fundamental_freq: f32,
        sample_rate: f32,
        max_harmonic: u32,
        q_factor: f32,
        channel_count: usize,
    ) -> Result<Self, FilterError> {
        let nyquist = sample_rate / 2.0;
        if fundamental_freq <= 0.0 || fundamental_freq >= nyquist {
            return Err(FilterError::InvalidParameters(format!(
                "notch frequency {} Hz outside (0, {}) Hz", fundamental_freq, nyquist
            )));
        }
        if q_factor <= 0.0 {
            return Err(FilterError::InvalidParameters(format!("Q factor {} must be positive", q_factor)));
        }
        if channel_count == 0 {
            return Err(FilterError::InvalidParameters("at least one channel required".to_string()));
        }

        let sections: Vec<NotchCoefficients> = (1..=max_harmonic.max(1))
            .map(|harmonic| fundamental_freq * harmonic as f32)
            .take_while(|&freq| freq < nyquist)
            .map(|freq| NotchCoefficients::design(freq, q_factor, sample_rate))
            .collect();

        let state = FilterState::zeroed(channel_count, sections.len());

        Ok(Self {
            sections,
            state,
            fundamental_freq,
        })
    }

    pub fn fundamental_freq(&self) -> f32 {
        self.fundamental_freq
    }

    pub fn section_count(&self) -> usize {
        self.sections.len()
    }

    pub fn channel_count(&self) -> usize {
        self.state.channels.len()
    }

    pub fn state(&self) -> &FilterState {
        &self.state
    }

    /// Filter one multi-channel sample in place, advancing the state
    pub fn process_sample(&mut self, sample: &mut [f32]) -> Result<(), FilterError> {
        if sample.len() != self.state.channels.len() {
            return Err(FilterError::ChannelMismatch {
                expected: self.state.channels.len(),
                actual: sample.len(),
            });
        }

        let channels = self.state.channels.iter_mut().zip(self.state.primed.iter_mut());
        for (value, (channel_state, primed)) in sample.iter_mut().zip(channels) {
            let mut signal = *value as f64;
            if !*primed {
                // unity DC gain: every section settles at the first input
                for s in channel_state.iter_mut() {
                    *s = [signal; 4];
                }
                *primed = true;
            }
            for (c, s) in self.sections.iter().zip(channel_state.iter_mut()) {
                let output = c.b0 * signal + c.b1 * s[0] + c.b2 * s[1] - c.a1 * s[2] - c.a2 * s[3];
                s[1] = s[0];
                s[0] = signal;
                s[3] = s[2];
                s[2] = output;
                signal = output;
            }
            *value = signal as f32;
        }
        Ok(())
    }

    /// Reset all delay lines
    pub fn reset(&mut self) {
        let sections = self.sections.len();
        let channels = self.state.channels.len();
        self.state = FilterState::zeroed(channels, sections);
    }
}
