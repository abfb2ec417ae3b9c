// src/config/constants.rs
//! System-wide configuration constants

/// Sample buffer and epoch timing
pub mod signal {
    /// Length of the raw sample buffer in seconds
    pub const DEFAULT_BUFFER_LENGTH_S: f32 = 5.0;
    /// Length of one analysis epoch in seconds
    pub const DEFAULT_EPOCH_LENGTH_S: f32 = 1.0;
    /// Overlap between consecutive epochs in seconds
    pub const DEFAULT_OVERLAP_LENGTH_S: f32 = 0.8;
    /// Electrode 0 is the left ear on a Muse headband
    pub const DEFAULT_CHANNELS: [usize; 1] = [0];

    pub const MIN_SAMPLE_RATE_HZ: f32 = 16.0;
    pub const MAX_SAMPLE_RATE_HZ: f32 = 10_000.0;
    pub const MAX_CHANNEL_COUNT: usize = 64;
}

/// Powerline notch filter
pub mod filters {
    pub const POWERLINE_FREQ_50HZ: f32 = 50.0;
    pub const POWERLINE_FREQ_60HZ: f32 = 60.0;
    pub const DEFAULT_NOTCH_Q: f32 = 30.0;
    pub const MIN_NOTCH_Q: f32 = 0.5;
}

/// EEG frequency bands in Hz, lower edge inclusive, upper edge exclusive
pub mod bands {
    pub const DELTA_HZ: (f32, f32) = (0.0, 4.0);
    pub const THETA_HZ: (f32, f32) = (4.0, 8.0);
    pub const ALPHA_HZ: (f32, f32) = (8.0, 12.0);
    pub const BETA_HZ: (f32, f32) = (12.0, 30.0);
}

/// Metric derivation
pub mod metric {
    /// Denominator band powers at or below this are treated as zero
    pub const DEFAULT_DEGENERATE_EPSILON: f32 = 1e-12;
}

/// Baseline tracking and event gating
pub mod decision {
    pub const DEFAULT_DRIFT_THRESHOLD: f32 = 0.05;
    pub const DEFAULT_BOUNDS_WIDTH: f32 = 0.04;
    pub const DEFAULT_COOLDOWN_S: f32 = 5.0;
    pub const DEFAULT_EVENT_DURATION_MS: u64 = 5000;
}

/// Acquisition polling
pub mod acquisition {
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;
    pub const DEFAULT_PULL_TIMEOUT_MS: u64 = 1000;
    pub const DEFAULT_MAX_CHUNK_LEN: usize = 12;
    pub const DEFAULT_SYNTHETIC_SAMPLE_RATE_HZ: f32 = 256.0;
}

/// Actuation transport
pub mod actuation {
    pub const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:3000/move";
    pub const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 2000;
}

/// Configuration file discovery
pub mod paths {
    pub const CONFIG_FILE_NAME: &str = "neurofeedback.toml";
    pub const ENV_PREFIX: &str = "NF";
    pub const ENV_SEPARATOR: &str = "__";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bands_are_ordered_and_disjoint() {
        let edges = [bands::DELTA_HZ, bands::THETA_HZ, bands::ALPHA_HZ, bands::BETA_HZ];
        for pair in edges.windows(2) {
            assert!(pair[0].0 < pair[0].1);
            assert!(pair[0].1 <= pair[1].0);
        }
    }

    #[test]
    fn test_overlap_shorter_than_epoch() {
        assert!(signal::DEFAULT_OVERLAP_LENGTH_S < signal::DEFAULT_EPOCH_LENGTH_S);
        assert!(signal::DEFAULT_EPOCH_LENGTH_S <= signal::DEFAULT_BUFFER_LENGTH_S);
    }

    #[test]
    fn test_drift_wider_than_bounds() {
        assert!(decision::DEFAULT_DRIFT_THRESHOLD > decision::DEFAULT_BOUNDS_WIDTH);
    }
}
