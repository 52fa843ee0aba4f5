//! Resource Loader Metrics
//!
//! Updated from many tasks at once, so every counter is an atomic and reads
//! are observational snapshots.

use super::CacheMetrics;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by [`ResourceLoader`](crate::loader::ResourceLoader).
#[derive(Debug, Default)]
pub struct LoaderMetrics {
    /// Requests answered straight from the store.
    pub(crate) fast_hits: AtomicU64,
    /// Requests that joined a production already in flight.
    pub(crate) coalesced: AtomicU64,
    /// Productions started (one per miss episode).
    pub(crate) episodes: AtomicU64,
    /// Episodes resolved by the re-check after acquiring a permit.
    pub(crate) late_hits: AtomicU64,
    /// Producer invocations that succeeded.
    pub(crate) loads_succeeded: AtomicU64,
    /// Producer invocations that failed.
    pub(crate) loads_failed: AtomicU64,
    /// Productions that ended without a result.
    pub(crate) loads_aborted: AtomicU64,
}

impl LoaderMetrics {
    #[inline]
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Requests answered from the store without waiting.
    pub fn fast_hits(&self) -> u64 {
        self.fast_hits.load(Ordering::Relaxed)
    }

    /// Requests that attached to an existing production.
    pub fn coalesced(&self) -> u64 {
        self.coalesced.load(Ordering::Relaxed)
    }

    /// Miss episodes started.
    pub fn episodes(&self) -> u64 {
        self.episodes.load(Ordering::Relaxed)
    }

    /// Episodes that found the value already stored after acquiring a permit.
    pub fn late_hits(&self) -> u64 {
        self.late_hits.load(Ordering::Relaxed)
    }

    /// Successful producer invocations.
    pub fn loads_succeeded(&self) -> u64 {
        self.loads_succeeded.load(Ordering::Relaxed)
    }

    /// Failed producer invocations.
    pub fn loads_failed(&self) -> u64 {
        self.loads_failed.load(Ordering::Relaxed)
    }

    /// Productions that ended without a result.
    pub fn loads_aborted(&self) -> u64 {
        self.loads_aborted.load(Ordering::Relaxed)
    }

    /// Producer invocations, successful or not.
    pub fn producer_calls(&self) -> u64 {
        self.loads_succeeded() + self.loads_failed()
    }
}

impl CacheMetrics for LoaderMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("coalesced".to_string(), self.coalesced() as f64);
        metrics.insert("episodes".to_string(), self.episodes() as f64);
        metrics.insert("fast_hits".to_string(), self.fast_hits() as f64);
        metrics.insert("late_hits".to_string(), self.late_hits() as f64);
        metrics.insert("loads_aborted".to_string(), self.loads_aborted() as f64);
        metrics.insert("loads_failed".to_string(), self.loads_failed() as f64);
        metrics.insert(
            "loads_succeeded".to_string(),
            self.loads_succeeded() as f64,
        );
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        "ResourceLoader"
    }
}
