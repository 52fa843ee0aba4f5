//! TTL-LRU Cache Metrics

use super::{CacheMetrics, CoreCacheMetrics};
use std::collections::BTreeMap;

/// Metrics for the TTL-aware LRU cache.
///
/// Wraps the core counters and adds a point-in-time view of occupancy, which
/// the cache refreshes whenever metrics are read.
#[derive(Debug, Clone, Default)]
pub struct LruCacheMetrics {
    /// Core metrics common to all stores
    pub core: CoreCacheMetrics,
    /// Entry count at the time of the snapshot
    pub len: usize,
    /// Configured capacity
    pub capacity: usize,
}

impl LruCacheMetrics {
    /// Creates empty metrics for a cache of the given capacity.
    pub fn new(capacity: usize) -> Self {
        Self {
            core: CoreCacheMetrics::default(),
            len: 0,
            capacity,
        }
    }

    /// Fraction of capacity in use, or 0.0 for a zero-capacity cache.
    pub fn utilization(&self) -> f64 {
        if self.capacity > 0 {
            self.len as f64 / self.capacity as f64
        } else {
            0.0
        }
    }

    /// Converts to a map with stable key order.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.core.to_btreemap();
        metrics.insert("capacity".to_string(), self.capacity as f64);
        metrics.insert("len".to_string(), self.len as f64);
        metrics.insert("utilization".to_string(), self.utilization());
        metrics
    }
}

impl CacheMetrics for LruCacheMetrics {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.to_btreemap()
    }

    fn algorithm_name(&self) -> &'static str {
        "TTL-LRU"
    }
}
