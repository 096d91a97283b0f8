//! Process-wide event counters

use std::sync::atomic::{AtomicU64, Ordering};

/// Monotonic counter usable from a `static`.
///
/// Relaxed ordering: values are statistics, never used for synchronization.
#[derive(Debug, Default)]
pub struct Counter {
    value: AtomicU64,
}

impl Counter {
    pub const fn new() -> Self {
        Self {
            value: AtomicU64::new(0),
        }
    }

    #[inline]
    pub fn increment(&self, value: u64) {
        self.value.fetch_add(value, Ordering::Relaxed);
    }

    /// Keep the largest value seen (high-water mark).
    #[inline]
    pub fn record_max(&self, value: u64) {
        self.value.fetch_max(value, Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u64 {
        self.value.load(Ordering::Relaxed)
    }

    /// Read and zero in one step.
    #[inline]
    pub fn take(&self) -> u64 {
        self.value.swap(0, Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.value.store(0, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_accumulate() {
        let counter = Counter::new();
        counter.increment(2);
        counter.increment(5);
        assert_eq!(counter.get(), 7);
        assert_eq!(counter.take(), 7);
        assert_eq!(counter.get(), 0);
    }

    #[test]
    fn record_max_keeps_high_water_mark() {
        let counter = Counter::new();
        counter.record_max(4);
        counter.record_max(2);
        assert_eq!(counter.get(), 4);
    }
}
