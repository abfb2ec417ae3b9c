//! Neurofeedback core: real-time EEG band-power metric with adaptive baseline
//! and event gating
//!
//! The library turns a stream of multi-channel EEG samples into discrete
//! `UP`/`DOWN` events:
//!
//! - Sliding sample buffer with a causal powerline notch filter
//! - Epoch extraction and FFT band powers (delta, theta, alpha, beta)
//! - Running-mean smoothing and a band-power ratio metric
//! - Hard re-anchoring baseline and a cooldown-gated event emitter
//! - Async acquisition and actuation seams driven by a tokio runtime loop
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use neurofeedback_core::acquisition::{SyntheticConfig, SyntheticSource};
//! use neurofeedback_core::actuation::LogSink;
//! use neurofeedback_core::{NeurofeedbackConfig, Runtime};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut source = SyntheticSource::new(SyntheticConfig::default())?;
//!     let (_stop, shutdown) = tokio::sync::watch::channel(false);
//!
//!     let summary = Runtime::new(NeurofeedbackConfig::default())
//!         .run(&mut source, &LogSink, shutdown)
//!         .await?;
//!     println!("{:?}", summary);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_inception)]

pub mod acquisition;
pub mod actuation;
pub mod config;
pub mod error;
pub mod processing;
pub mod runtime;
pub mod utils;

// Re-export commonly used types for convenience
pub use acquisition::{SampleBuffer, SampleChunk, SampleSource, EpochExtractor, Epoch};
pub use actuation::{DispatchError, EventSink, RecordingSink};
pub use config::{ConfigLoader, NeurofeedbackConfig, PipelineGeometry};
pub use error::{NeuroError, NeuroResult};
pub use processing::{
    BandPowerEstimator, BandPowerHistory, BandPowers, BaselineTracker, CycleOutcome, Direction,
    Event, EventGate, MetricKind, SignalPipeline,
};
pub use runtime::{RunSummary, Runtime, StopReason};
pub use utils::time::TimeProvider;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Get library information
pub fn version_info() -> VersionInfo {
    VersionInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: "Real-time EEG band-power neurofeedback core".to_string(),
        features: vec![
            "Sliding sample buffer with powerline notch".to_string(),
            "FFT band powers and smoothed ratio metric".to_string(),
            "Adaptive baseline with cooldown-gated events".to_string(),
            "Layered TOML and environment configuration".to_string(),
        ],
    }
}

/// Library version information
#[derive(Debug, Clone)]
pub struct VersionInfo {
    /// Library name
    pub name: String,
    /// Version string
    pub version: String,
    /// Description
    pub description: String,
    /// List of features
    pub features: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info() {
        let info = version_info();
        assert_eq!(info.name, NAME);
        assert_eq!(info.version, VERSION);
        assert!(!info.features.is_empty());
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "neurofeedback-core");
    }
}
