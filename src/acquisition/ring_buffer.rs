// src/acquisition/ring_buffer.rs
//! Fixed-capacity sliding window used for raw samples and band-power history

use std::collections::VecDeque;

/// Ring buffer error types
#[derive(Debug, PartialEq)]
pub enum RingBufferError {
    InvalidCapacity,
}

impl std::fmt::Display for RingBufferError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RingBufferError::InvalidCapacity => write!(f, "Invalid buffer capacity (must be non-zero)"),
        }
    }
}

impl std::error::Error for RingBufferError {}

/// Sliding window that evicts its oldest entries once full
///
/// Unlike a reset-on-full buffer, every push past capacity drops exactly as
/// many entries from the head as it appends to the tail, so `len()` grows to
/// `capacity()` and then stays there.
#[derive(Debug, Clone)]
pub struct SlidingWindow<T> {
    buffer: VecDeque<T>,
    capacity: usize,
    total_pushed: u64,
}

impl<T> SlidingWindow<T> {
    /// Create an empty window
    pub fn new(capacity: usize) -> Result<Self, RingBufferError> {
        if capacity == 0 {
            return Err(RingBufferError::InvalidCapacity);
        }

        Ok(Self {
            buffer: VecDeque::with_capacity(capacity),
            capacity,
            total_pushed: 0,
        })
    }

    /// Append one item, evicting the oldest when full
    pub fn push(&mut self, item: T) -> Option<T> {
        self.total_pushed += 1;
        let evicted = if self.buffer.len() == self.capacity {
            self.buffer.pop_front()
        } else {
            None
        };
        self.buffer.push_back(item);
        evicted
    }

    /// Append a batch in order; returns how many items were evicted
    pub fn extend<I: IntoIterator<Item = T>>(&mut self, items: I) -> usize {
        items.into_iter().filter_map(|item| self.push(item)).count()
    }

    /// The most recent `n` items, oldest first
    pub fn latest(&self, n: usize) -> Option<impl Iterator<Item = &T>> {
        if n > self.buffer.len() {
            return None;
        }
        Some(self.buffer.iter().skip(self.buffer.len() - n))
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.buffer.iter()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Items pushed over the window's lifetime, including evicted ones
    pub fn total_pushed(&self) -> u64 {
        self.total_pushed
    }

    /// Current fill level (0.0 to 1.0)
    pub fn utilization(&self) -> f32 {
        self.buffer.len() as f32 / self.capacity as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_push_evicts_oldest() {
        let mut window = SlidingWindow::new(3).unwrap();

        assert_eq!(window.push(1), None);
        assert_eq!(window.push(2), None);
        assert_eq!(window.push(3), None);
        assert_eq!(window.push(4), Some(1));

        let contents: Vec<i32> = window.iter().copied().collect();
        assert_eq!(contents, vec![2, 3, 4]);
        assert_eq!(window.total_pushed(), 4);
    }

    #[test]
    fn test_latest() {
        let mut window = SlidingWindow::new(8).unwrap();
        window.extend(0..5);

        let tail: Vec<i32> = window.latest(2).unwrap().copied().collect();
        assert_eq!(tail, vec![3, 4]);
        assert!(window.latest(6).is_none());
    }

    #[test]
    fn test_utilization() {
        let mut window = SlidingWindow::new(4).unwrap();
        assert_eq!(window.utilization(), 0.0);

        window.extend([1, 2]);
        assert_eq!(window.utilization(), 0.5);
        window.extend([3, 4, 5]);
        assert_eq!(window.utilization(), 1.0);
    }

    #[test]
    fn test_invalid_capacity() {
        assert!(SlidingWindow::<i32>::new(0).is_err());
        assert!(SlidingWindow::<i32>::new(3).is_ok());
    }

    proptest! {
        #[test]
        fn prop_length_never_exceeds_capacity(
            capacity in 1usize..64,
            chunks in proptest::collection::vec(proptest::collection::vec(any::<i16>(), 0..40), 0..30),
        ) {
            let mut window = SlidingWindow::new(capacity).unwrap();
            let mut pushed = 0usize;
            for chunk in chunks {
                pushed += chunk.len();
                let evicted = window.extend(chunk);
                prop_assert_eq!(window.len(), pushed.min(capacity));
                prop_assert!(evicted <= capacity.max(pushed));
            }
        }

        #[test]
        fn prop_keeps_most_recent_items(
            capacity in 1usize..32,
            items in proptest::collection::vec(any::<i32>(), 0..100),
        ) {
            let mut window = SlidingWindow::new(capacity).unwrap();
            window.extend(items.iter().copied());
            let expected: Vec<i32> = items.iter().skip(items.len().saturating_sub(capacity)).copied().collect();
            let actual: Vec<i32> = window.iter().copied().collect();
            prop_assert_eq!(actual, expected);
        }
    }
}
