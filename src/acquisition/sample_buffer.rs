// src/acquisition/sample_buffer.rs
//! Filtered raw-sample buffer and epoch extraction

use crate::acquisition::ring_buffer::SlidingWindow;
use crate::config::{PipelineGeometry, SignalConfig};
use crate::error::{NeuroErrorBuilder, NeuroResult, ProcessingStage};
use crate::processing::filters::{FilterState, PowerLineNotchFilter};
use ndarray::Array2;

/// Sliding window of the most recent `buffer_samples` multi-channel samples
///
/// Samples pass through the causal notch filter on the way in; the filter's
/// state is never reset between updates.
pub struct SampleBuffer {
    window: SlidingWindow<Vec<f32>>,
    notch: Option<PowerLineNotchFilter>,
    channel_count: usize,
}

impl SampleBuffer {
    /// Create an unfiltered buffer
    pub fn new(capacity: usize, channel_count: usize) -> NeuroResult<Self> {
        let window = SlidingWindow::new(capacity).map_err(|e| {
            NeuroErrorBuilder::new("sample_buffer", "new").configuration(&e.to_string())
        })?;
        if channel_count == 0 {
            return Err(NeuroErrorBuilder::new("sample_buffer", "new")
                .configuration("at least one channel required"));
        }

        Ok(Self {
            window,
            notch: None,
            channel_count,
        })
    }

    /// Create a buffer sized and filtered according to configuration
    pub fn from_config(signal: &SignalConfig, geometry: &PipelineGeometry) -> NeuroResult<Self> {
        let mut buffer = Self::new(geometry.buffer_samples, signal.channels.len())?;
        if signal.notch_enabled {
            buffer.notch = Some(PowerLineNotchFilter::new(
                signal.notch_frequency_hz,
                geometry.sample_rate_hz,
                1,
                signal.notch_q,
                signal.channels.len(),
            )?);
        }
        Ok(buffer)
    }

    /// Attach a notch filter
    pub fn with_notch(mut self, notch: PowerLineNotchFilter) -> Self {
        self.notch = Some(notch);
        self
    }

    /// Append new samples, evicting as many of the oldest once full
    ///
    /// Chunks of any length are accepted, including empty and partial ones.
    /// The only failure is a sample whose width differs from the channel count.
    pub fn update(&mut self, new_samples: &[Vec<f32>]) -> NeuroResult<usize> {
        let mut evicted = 0;
        for sample in new_samples {
            if sample.len() != self.channel_count {
                return Err(NeuroErrorBuilder::new("sample_buffer", "update").processing(
                    ProcessingStage::Acquisition,
                    &format!("sample has {} channels, expected {}", sample.len(), self.channel_count),
                ));
            }

            let mut filtered = sample.clone();
            if let Some(notch) = self.notch.as_mut() {
                notch.process_sample(&mut filtered)?;
            }
            if self.window.push(filtered).is_some() {
                evicted += 1;
            }
        }
        Ok(evicted)
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.window.capacity()
    }

    pub fn is_full(&self) -> bool {
        self.window.is_full()
    }

    pub fn channel_count(&self) -> usize {
        self.channel_count
    }

    /// Samples received over the buffer's lifetime
    pub fn total_samples(&self) -> u64 {
        self.window.total_pushed()
    }

    pub fn filter_state(&self) -> Option<&FilterState> {
        self.notch.as_ref().map(|n| n.state())
    }

    fn tail(&self, n: usize) -> Option<Array2<f32>> {
        let samples = self.window.latest(n)?;
        let mut data = Array2::zeros((n, self.channel_count));
        for (mut row, sample) in data.rows_mut().into_iter().zip(samples) {
            for (dst, &src) in row.iter_mut().zip(sample.iter()) {
                *dst = src;
            }
        }
        Some(data)
    }
}

/// One fixed-length analysis window, rows are samples and columns channels
#[derive(Debug, Clone, PartialEq)]
pub struct Epoch {
    data: Array2<f32>,
}

impl Epoch {
    /// Wrap raw data
    pub fn new(data: Array2<f32>) -> Self {
        Self { data }
    }

    /// Build a single-channel epoch
    pub fn from_channel(samples: &[f32]) -> Self {
        let data = Array2::from_shape_fn((samples.len(), 1), |(i, _)| samples[i]);
        Self { data }
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.data
    }

    pub fn sample_count(&self) -> usize {
        self.data.nrows()
    }

    pub fn channel_count(&self) -> usize {
        self.data.ncols()
    }
}

/// Pulls the most recent epoch from a [`SampleBuffer`]
#[derive(Debug, Clone, Copy)]
pub struct EpochExtractor {
    epoch_samples: usize,
}

impl EpochExtractor {
    pub fn new(epoch_samples: usize) -> Self {
        Self { epoch_samples }
    }

    pub fn epoch_samples(&self) -> usize {
        self.epoch_samples
    }

    /// The most recent `epoch_samples` samples
    ///
    /// Fails with `InsufficientData` while the buffer is still filling.
    pub fn latest(&self, buffer: &SampleBuffer) -> NeuroResult<Epoch> {
        buffer
            .tail(self.epoch_samples)
            .map(Epoch::new)
            .ok_or_else(|| {
                NeuroErrorBuilder::new("epoch_extractor", "latest")
                    .insufficient_data(self.epoch_samples, buffer.len())
            })
    }
}
