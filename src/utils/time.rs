// src/utils/time.rs
//! Clock abstraction for processing-time measurement

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Time provider trait for dependency injection and testing
pub trait TimeProvider: Send + Sync {
    fn now_nanos(&self) -> u64;
    fn now_micros(&self) -> u64 {
        self.now_nanos() / 1000
    }
}

/// Monotonic clock measured from the provider's creation
pub struct MonotonicTimeProvider {
    origin: Instant,
}

impl MonotonicTimeProvider {
    pub fn new() -> Self {
        Self { origin: Instant::now() }
    }
}

impl Default for MonotonicTimeProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicTimeProvider {
    fn now_nanos(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

/// Mock time provider for deterministic testing
pub struct MockTimeProvider {
    current_time: AtomicU64,
    step: AtomicU64,
}

impl MockTimeProvider {
    pub fn new(initial_time_nanos: u64) -> Self {
        Self {
            current_time: AtomicU64::new(initial_time_nanos),
            step: AtomicU64::new(0),
        }
    }

    /// Advance the clock by `nanos` on every read
    pub fn with_step(self, nanos: u64) -> Self {
        self.step.store(nanos, Ordering::Relaxed);
        self
    }

    pub fn advance_by(&self, nanos: u64) {
        self.current_time.fetch_add(nanos, Ordering::Relaxed);
    }

    pub fn set_time(&self, nanos: u64) {
        self.current_time.store(nanos, Ordering::Relaxed);
    }
}

impl TimeProvider for MockTimeProvider {
    fn now_nanos(&self) -> u64 {
        let step = self.step.load(Ordering::Relaxed);
        self.current_time.fetch_add(step, Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monotonic_never_decreases() {
        let clock = MonotonicTimeProvider::new();
        let a = clock.now_nanos();
        let b = clock.now_nanos();
        assert!(b >= a);
    }

    #[test]
    fn test_mock_step() {
        let clock = MockTimeProvider::new(1_000).with_step(500);
        assert_eq!(clock.now_nanos(), 1_000);
        assert_eq!(clock.now_nanos(), 1_500);
        clock.set_time(0);
        assert_eq!(clock.now_micros(), 0);
    }

    #[test]
    fn test_mock_advance() {
        let clock = MockTimeProvider::new(0);
        clock.advance_by(2_000);
        assert_eq!(clock.now_micros(), 2);
    }
}
