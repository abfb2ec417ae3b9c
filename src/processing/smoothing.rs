// src/processing/smoothing.rs
//! Running mean over recent band powers

use crate::acquisition::ring_buffer::SlidingWindow;
use crate::error::{NeuroErrorBuilder, NeuroResult};
use crate::processing::bandpower::BandPowers;

/// Element-wise mean of the band powers currently held in history
pub type SmoothedBandPowers = BandPowers;

/// Fixed-length history of per-epoch band powers
///
/// The length comes from [`crate::config::PipelineGeometry::history_len`]; it
/// is not configured on its own.
#[derive(Debug, Clone)]
pub struct BandPowerHistory {
    window: SlidingWindow<BandPowers>,
}

impl BandPowerHistory {
    pub fn new(history_len: usize) -> NeuroResult<Self> {
        let window = SlidingWindow::new(history_len).map_err(|e| {
            NeuroErrorBuilder::new("band_power_history", "new").configuration(&e.to_string())
        })?;
        Ok(Self { window })
    }

    /// Record one epoch's band powers and return the smoothed value
    pub fn push(&mut self, band_powers: BandPowers) -> SmoothedBandPowers {
        self.window.push(band_powers);
        self.mean()
    }

    /// Mean over the entries present; zero before the first push
    pub fn mean(&self) -> SmoothedBandPowers {
        if self.window.is_empty() {
            return BandPowers::default();
        }

        let mut sums = [0.0f64; 4];
        for entry in self.window.iter() {
            for (sum, &v) in sums.iter_mut().zip(entry.0.iter()) {
                *sum += v as f64;
            }
        }
        let n = self.window.len() as f64;
        BandPowers(sums.map(|s| (s / n) as f32))
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
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_of_known_sequence() {
        let mut history = BandPowerHistory::new(3).unwrap();

        history.push(BandPowers::new(1.0, 2.0, 3.0, 4.0));
        let smoothed = history.push(BandPowers::new(3.0, 4.0, 5.0, 6.0));
        assert_eq!(smoothed, BandPowers::new(2.0, 3.0, 4.0, 5.0));
    }

    #[test]
    fn test_oldest_entry_evicted() {
        let mut history = BandPowerHistory::new(2).unwrap();
        history.push(BandPowers::new(100.0, 100.0, 100.0, 100.0));
        history.push(BandPowers::new(1.0, 1.0, 1.0, 1.0));
        let smoothed = history.push(BandPowers::new(3.0, 5.0, 7.0, 9.0));

        assert_eq!(history.len(), 2);
        assert_eq!(smoothed, BandPowers::new(2.0, 3.0, 4.0, 5.0));
    }

    #[test]
    fn test_zero_powers_are_data() {
        let mut history = BandPowerHistory::new(4).unwrap();
        history.push(BandPowers::new(4.0, 4.0, 4.0, 4.0));
        let smoothed = history.push(BandPowers::default());
        assert_eq!(smoothed, BandPowers::new(2.0, 2.0, 2.0, 2.0));
    }

    #[test]
    fn test_empty_history_mean_is_zero() {
        let history = BandPowerHistory::new(4).unwrap();
        assert!(history.mean().is_zero());
        assert!(BandPowerHistory::new(0).is_err());
    }
}
