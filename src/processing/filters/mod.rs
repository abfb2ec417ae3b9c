// src/processing/filters/mod.rs
//! Causal digital filters applied to samples as they enter the sample buffer

pub mod notch;

pub use notch::*;

use thiserror::Error;

/// Common filter error types
#[derive(Debug, Error, PartialEq)]
pub enum FilterError {
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),
    #[error("Channel count mismatch: filter has {expected}, sample has {actual}")]
    ChannelMismatch { expected: usize, actual: usize },
}
