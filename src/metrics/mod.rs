//! Cache Metrics System
//!
//! Every component of the crate keeps its own counters and reports them
//! through the common [`CacheMetrics`] trait as a `BTreeMap<String, f64>`.
//!
//! # Why BTreeMap over HashMap?
//!
//! - **Deterministic ordering**: metrics always appear in the same order
//! - **Reproducible output**: log lines and test assertions stay stable
//! - **Better debugging**: consistent output makes diffs readable
//!
//! # Components
//!
//! | Metrics type | Reported by | Synchronization |
//! |--------------|-------------|-----------------|
//! | [`LruCacheMetrics`] | `LruCache`, `ConcurrentLruCache` | cache lock |
//! | [`LoaderMetrics`] | `ResourceLoader` | atomics |
//! | [`ManagerMetrics`] | `AdaptiveCacheManager` | atomics |

use std::collections::BTreeMap;

pub mod loader;
pub mod lru;
pub mod manager;

pub use loader::LoaderMetrics;
pub use lru::LruCacheMetrics;
pub use manager::ManagerMetrics;

/// Counters common to every key/value store.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CoreCacheMetrics {
    /// Total number of lookups
    pub requests: u64,

    /// Lookups that found a live entry
    pub cache_hits: u64,

    /// New keys written into the cache
    pub insertions: u64,

    /// Existing keys whose value was replaced
    pub updates: u64,

    /// Entries dropped to respect the capacity bound
    pub evictions: u64,

    /// Entries dropped because their TTL elapsed
    pub expirations: u64,

    /// Entries dropped by `remove` or `clear`
    pub removals: u64,
}

impl CoreCacheMetrics {
    /// Records a lookup that found a live entry.
    pub fn record_hit(&mut self) {
        self.requests += 1;
        self.cache_hits += 1;
    }

    /// Records a lookup that found nothing (or only an expired entry).
    ///
    /// Misses are reported as `requests - cache_hits`.
    pub fn record_miss(&mut self) {
        self.requests += 1;
    }

    /// Records a brand-new key.
    pub fn record_insertion(&mut self) {
        self.insertions += 1;
    }

    /// Records a replaced value.
    pub fn record_update(&mut self) {
        self.updates += 1;
    }

    /// Records `count` capacity evictions.
    pub fn record_evictions(&mut self, count: u64) {
        self.evictions += count;
    }

    /// Records `count` TTL expirations.
    pub fn record_expirations(&mut self, count: u64) {
        self.expirations += count;
    }

    /// Records `count` explicit removals.
    pub fn record_removals(&mut self, count: u64) {
        self.removals += count;
    }

    /// Lookups that missed.
    pub fn cache_misses(&self) -> u64 {
        self.requests - self.cache_hits
    }

    /// Hit rate in `[0.0, 1.0]`, or 0.0 before the first lookup.
    pub fn hit_rate(&self) -> f64 {
        if self.requests > 0 {
            self.cache_hits as f64 / self.requests as f64
        } else {
            0.0
        }
    }

    /// Converts the counters to a map with stable key order.
    pub fn to_btreemap(&self) -> BTreeMap<String, f64> {
        let mut metrics = BTreeMap::new();

        metrics.insert("cache_hits".to_string(), self.cache_hits as f64);
        metrics.insert("cache_misses".to_string(), self.cache_misses() as f64);
        metrics.insert("evictions".to_string(), self.evictions as f64);
        metrics.insert("expirations".to_string(), self.expirations as f64);
        metrics.insert("insertions".to_string(), self.insertions as f64);
        metrics.insert("removals".to_string(), self.removals as f64);
        metrics.insert("requests".to_string(), self.requests as f64);
        metrics.insert("updates".to_string(), self.updates as f64);

        metrics.insert("hit_rate".to_string(), self.hit_rate());
        if self.requests > 0 {
            metrics.insert("miss_rate".to_string(), 1.0 - self.hit_rate());
        }

        metrics
    }
}

/// Uniform metrics reporting for every component.
pub trait CacheMetrics {
    /// Returns all metrics as key-value pairs in deterministic order.
    fn metrics(&self) -> BTreeMap<String, f64>;

    /// Short name identifying the reporting component (e.g. "TTL-LRU").
    fn algorithm_name(&self) -> &'static str;
}
