//! Adaptive Manager Metrics

use super::CacheMetrics;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Counters kept by [`AdaptiveCacheManager`](crate::manager::AdaptiveCacheManager).
#[derive(Debug, Default)]
pub struct ManagerMetrics {
    pub(crate) polls: AtomicU64,
    pub(crate) normal_polls: AtomicU64,
    pub(crate) high_polls: AtomicU64,
    pub(crate) critical_polls: AtomicU64,
    pub(crate) sample_failures: AtomicU64,
    pub(crate) skipped_sweeps: AtomicU64,
    pub(crate) caches_cleared: AtomicU64,
    pub(crate) clear_failures: AtomicU64,
    pub(crate) reclaim_requests: AtomicU64,
    pub(crate) entries_trimmed: AtomicU64,
}

impl ManagerMetrics {
    #[inline]
    pub(crate) fn add(counter: &AtomicU64, n: u64) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    /// Completed poll cycles, including those that failed to sample.
    pub fn polls(&self) -> u64 {
        self.polls.load(Ordering::Relaxed)
    }

    /// Polls classified as Normal.
    pub fn normal_polls(&self) -> u64 {
        self.normal_polls.load(Ordering::Relaxed)
    }

    /// Polls classified as High.
    pub fn high_polls(&self) -> u64 {
        self.high_polls.load(Ordering::Relaxed)
    }

    /// Polls classified as Critical.
    pub fn critical_polls(&self) -> u64 {
        self.critical_polls.load(Ordering::Relaxed)
    }

    /// Polls abandoned because memory could not be sampled.
    pub fn sample_failures(&self) -> u64 {
        self.sample_failures.load(Ordering::Relaxed)
    }

    /// Sweeps skipped because another sweep held the cleanup lock.
    pub fn skipped_sweeps(&self) -> u64 {
        self.skipped_sweeps.load(Ordering::Relaxed)
    }

    /// Individual cache clears that completed.
    pub fn caches_cleared(&self) -> u64 {
        self.caches_cleared.load(Ordering::Relaxed)
    }

    /// Individual cache clears that panicked.
    pub fn clear_failures(&self) -> u64 {
        self.clear_failures.load(Ordering::Relaxed)
    }

    /// Heap reclamation hints issued.
    pub fn reclaim_requests(&self) -> u64 {
        self.reclaim_requests.load(Ordering::Relaxed)
    }

    /// Entries evicted by trimming.
    pub fn entries_trimmed(&self) -> u64 {
        self.entries_trimmed.load(Ordering::Relaxed)
    }
}

impl CacheMetrics for ManagerMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();
        metrics.insert("caches_cleared".to_string(), self.caches_cleared() as f64);
        metrics.insert("clear_failures".to_string(), self.clear_failures() as f64);
        metrics.insert("critical_polls".to_string(), self.critical_polls() as f64);
        metrics.insert("entries_trimmed".to_string(), self.entries_trimmed() as f64);
        metrics.insert("high_polls".to_string(), self.high_polls() as f64);
        metrics.insert("normal_polls".to_string(), self.normal_polls() as f64);
        metrics.insert("polls".to_string(), self.polls() as f64);
        metrics.insert(
            "reclaim_requests".to_string(),
            self.reclaim_requests() as f64,
        );
        metrics.insert("sample_failures".to_string(), self.sample_failures() as f64);
        metrics.insert("skipped_sweeps".to_string(), self.skipped_sweeps() as f64);
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        "AdaptiveCacheManager"
    }
}
