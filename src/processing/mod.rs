// src/processing/mod.rs
//! Signal processing and decision stages

pub mod bandpower;
pub mod baseline;
pub mod filters;
pub mod gate;
pub mod metric;
pub mod pipeline;
pub mod smoothing;

pub use bandpower::*;
pub use baseline::*;
pub use gate::*;
pub use metric::*;
pub use pipeline::*;
pub use smoothing::*;
