//! Overworld Metrics - event counters for engine instrumentation
//!
//! Provides zero-cost counters that completely vanish when the `metrics`
//! feature is off.
//!
//! # Feature Flags
//!
//! - `metrics` - Enable metrics collection (default: disabled)
//!
//! # Usage
//!
//! ```ignore
//! use overworld_metrics::Counter;
//!
//! static SEARCHES: Counter = Counter::new();
//!
//! SEARCHES.increment(1);
//! println!("searches: {}", SEARCHES.get());
//! ```
//!
//! Without the feature, `Counter` keeps the same API but stores nothing.

#[cfg(feature = "metrics")]
mod counter;

#[cfg(feature = "metrics")]
pub use counter::Counter;

// ============================================================================
// Macros for conditional compilation
// ============================================================================

/// Execute code only when metrics are enabled
#[macro_export]
macro_rules! metrics {
    ($($tt:tt)*) => {
        #[cfg(feature = "metrics")]
        {
            $($tt)*
        }
    };
}

// ============================================================================
// No-op stubs when metrics disabled
// ============================================================================

#[cfg(not(feature = "metrics"))]
#[derive(Debug, Default)]
pub struct Counter;

#[cfg(not(feature = "metrics"))]
impl Counter {
    pub const fn new() -> Self { Self }
    pub fn increment(&self, _value: u64) {}
    pub fn record_max(&self, _value: u64) {}
    pub fn get(&self) -> u64 { 0 }
    pub fn take(&self) -> u64 { 0 }
    pub fn reset(&self) {}
}

/// Whether counters in this build actually record.
pub const fn enabled() -> bool {
    cfg!(feature = "metrics")
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_counter_api_available() {
        // Same calls compile with and without the feature
        static COUNTER: super::Counter = super::Counter::new();
        COUNTER.increment(3);
        COUNTER.record_max(9);
        if super::enabled() {
            assert_eq!(COUNTER.get(), 9);
        } else {
            assert_eq!(COUNTER.get(), 0);
        }
        COUNTER.reset();
        assert_eq!(COUNTER.get(), 0);
    }
}
