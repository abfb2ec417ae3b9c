//! Common utilities

pub mod time;

pub use time::{
    MockTimeProvider,
    MonotonicTimeProvider,
    TimeProvider,
};
