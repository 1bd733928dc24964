//! Histogram sinks for interning-context statistics.
//!
//! A rewrite system feeds the shape of its rule trie into these counters
//! at teardown, so a long-lived context aggregates index statistics
//! across every system it outlives. Counters use relaxed atomics; totals
//! are exact once all systems sharing the context have been dropped.

use std::sync::atomic::{AtomicU64, Ordering};

/// Number of exact buckets. Samples at or above this value land in the
/// overflow bucket.
pub const BUCKET_COUNT: usize = 16;

/// A fixed-bucket histogram of small non-negative values.
pub struct Histogram {
    buckets: [AtomicU64; BUCKET_COUNT],
    overflow: AtomicU64,
}

impl Histogram {
    /// Create an empty histogram.
    pub fn new() -> Self {
        Self {
            buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            overflow: AtomicU64::new(0),
        }
    }

    /// Record one sample.
    pub fn record(&self, value: usize) {
        if value < BUCKET_COUNT {
            self.buckets[value].fetch_add(1, Ordering::Relaxed);
        } else {
            self.overflow.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Number of samples recorded exactly at `value`.
    ///
    /// # Panics
    ///
    /// Panics if `value >= BUCKET_COUNT`; use [`Histogram::overflow`] for
    /// the tail.
    pub fn bucket(&self, value: usize) -> u64 {
        self.buckets[value].load(Ordering::Relaxed)
    }

    /// Number of samples at or above `BUCKET_COUNT`.
    pub fn overflow(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    /// Total number of samples recorded.
    pub fn samples(&self) -> u64 {
        let exact: u64 = self
            .buckets
            .iter()
            .map(|bucket| bucket.load(Ordering::Relaxed))
            .sum();
        exact + self.overflow()
    }
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}
