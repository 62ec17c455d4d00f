//! Atomic counter shared between connection tasks.

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free `u64` counter.
///
/// Arithmetic wraps on overflow/underflow, matching the underlying atomic
/// operations. Every mutating method returns the value it produced, so a
/// caller can increment and read in one atomic step.
#[derive(Debug, Default)]
pub struct ConcurrentCounter {
    count: AtomicU64,
}

impl ConcurrentCounter {
    /// Creates a counter starting at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter starting at `value`.
    #[must_use]
    pub fn starting_at(value: u64) -> Self {
        Self {
            count: AtomicU64::new(value),
        }
    }

    /// Adds `n` and returns the new value.
    pub fn add(&self, n: u64) -> u64 {
        self.count.fetch_add(n, Ordering::Relaxed).wrapping_add(n)
    }

    /// Adds one and returns the new value.
    pub fn increment(&self) -> u64 {
        self.add(1)
    }

    /// Subtracts one and returns the new value.
    pub fn decrement(&self) -> u64 {
        self.count.fetch_sub(1, Ordering::Relaxed).wrapping_sub(1)
    }

    /// Sets the counter back to zero, returning the value it held.
    pub fn reset(&self) -> u64 {
        self.count.swap(0, Ordering::Relaxed)
    }

    /// Current value.
    #[must_use]
    pub fn value(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    #[test]
    fn starts_at_zero() {
        assert_eq!(ConcurrentCounter::new().value(), 0);
        assert_eq!(ConcurrentCounter::default().value(), 0);
    }

    #[test]
    fn increment_decrement_add_reset() {
        let counter = ConcurrentCounter::new();
        assert_eq!(counter.increment(), 1);
        assert_eq!(counter.increment(), 2);
        assert_eq!(counter.decrement(), 1);
        assert_eq!(counter.add(10), 11);
        assert_eq!(counter.value(), 11);
        assert_eq!(counter.reset(), 11);
        assert_eq!(counter.value(), 0);
    }

    #[test]
    fn decrement_below_zero_wraps() {
        let counter = ConcurrentCounter::new();
        assert_eq!(counter.decrement(), u64::MAX);
        assert_eq!(counter.increment(), 0);
    }

    #[test]
    fn starting_at_sets_initial_value() {
        let counter = ConcurrentCounter::starting_at(41);
        assert_eq!(counter.increment(), 42);
    }

    #[test]
    fn concurrent_increments_yield_unique_values() {
        let counter = Arc::new(ConcurrentCounter::new());
        let seen = Arc::new(parking_lot::Mutex::new(HashSet::new()));

        std::thread::scope(|s| {
            for _ in 0..8 {
                let counter = Arc::clone(&counter);
                let seen = Arc::clone(&seen);
                s.spawn(move || {
                    for _ in 0..1000 {
                        let v = counter.increment();
                        assert!(seen.lock().insert(v), "duplicate value {v}");
                    }
                });
            }
        });

        assert_eq!(counter.value(), 8000);
        assert_eq!(seen.lock().len(), 8000);
    }
}
