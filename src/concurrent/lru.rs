//! Concurrent TTL-LRU Cache Implementation
//!
//! A thread-safe LRU cache with optional time-to-live. This is the
//! multi-threaded counterpart to [`LruCache`](crate::LruCache) and the store
//! behind [`ResourceLoader`](crate::loader::ResourceLoader).
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │              ConcurrentLruCache              │
//! │                                              │
//! │   ┌──────────────────────────────────────┐   │
//! │   │     parking_lot::Mutex<LruSegment>   │   │
//! │   │                                      │   │
//! │   │  MRU ◀──▶ ... ◀──▶ ... ◀──▶ LRU      │   │
//! │   │  HashMap<K, node>   Clock   metrics  │   │
//! │   └──────────────────────────────────────┘   │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! # Thread Safety
//!
//! `ConcurrentLruCache` is `Send + Sync` and is meant to be shared via `Arc`.
//! It also implements [`ManagedCache`](crate::manager::ManagedCache), so it
//! can be registered with the adaptive manager directly.
//!
//! # Example
//!
//! ```
//! use adaptive_cache::concurrent::ConcurrentLruCache;
//! use adaptive_cache::config::LruCacheConfig;
//! use std::sync::Arc;
//! use std::thread;
//! use std::time::Duration;
//!
//! let config = LruCacheConfig::new(10_000).with_ttl(Duration::from_secs(600));
//! let cache = Arc::new(ConcurrentLruCache::init(config).unwrap());
//!
//! let handles: Vec<_> = (0..4).map(|i| {
//!     let cache = Arc::clone(&cache);
//!     thread::spawn(move || {
//!         for j in 0..1000 {
//!             cache.put(format!("key-{}-{}", i, j), j);
//!         }
//!     })
//! }).collect();
//!
//! for h in handles {
//!     h.join().unwrap();
//! }
//!
//! assert_eq!(cache.len(), 4000);
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::LruCacheConfig;
use crate::error::ConfigError;
use crate::lru::{DefaultHashBuilder, LruSegment};
use crate::manager::ManagedCache;
use crate::metrics::CacheMetrics;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// A thread-safe, capacity-bounded LRU cache with optional TTL.
///
/// # Type Parameters
///
/// - `K`: Key type. Must implement `Hash + Eq + Clone + Send`.
/// - `V`: Value type. Must implement `Clone + Send` for `get()`.
/// - `S`: Hash builder type. Defaults to `DefaultHashBuilder`.
///
/// # Example
///
/// ```
/// use adaptive_cache::concurrent::ConcurrentLruCache;
/// use std::sync::Arc;
///
/// let cache = Arc::new(ConcurrentLruCache::new(1000));
///
/// cache.put("key".to_string(), 42);
/// assert_eq!(cache.get("key"), Some(42));
/// ```
pub struct ConcurrentLruCache<K, V, S = DefaultHashBuilder> {
    segment: Mutex<LruSegment<K, V, S>>,
}

impl<K, V> ConcurrentLruCache<K, V, DefaultHashBuilder>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
{
    /// Creates a concurrent cache from a validated configuration.
    ///
    /// This is the **recommended** way to create a concurrent LRU cache.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroTtl`] if the configured TTL is zero.
    pub fn init(config: LruCacheConfig) -> Result<Self, ConfigError> {
        Self::init_with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a concurrent cache that reads time from `clock`.
    pub fn init_with_clock(
        config: LruCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Self::init_with_hasher(config, DefaultHashBuilder::default(), clock)
    }

    /// Creates a concurrent cache with the given capacity and no TTL.
    pub fn new(capacity: usize) -> Self {
        Self {
            segment: Mutex::new(LruSegment::with_hasher(
                LruCacheConfig::new(capacity),
                DefaultHashBuilder::default(),
                Arc::new(SystemClock),
            )),
        }
    }
}

impl<K, V, S> ConcurrentLruCache<K, V, S>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
    S: BuildHasher + Send,
{
    /// Creates a concurrent cache with a custom hash builder and clock.
    ///
    /// Use this for deterministic hashing or DoS-resistant hashers.
    pub fn init_with_hasher(
        config: LruCacheConfig,
        hash_builder: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            segment: Mutex::new(LruSegment::with_hasher(config, hash_builder, clock)),
        })
    }

    /// Returns the maximum number of entries.
    pub fn capacity(&self) -> usize {
        self.segment.lock().cap()
    }

    /// Returns the configured time-to-live.
    pub fn ttl(&self) -> Option<Duration> {
        self.segment.lock().ttl()
    }

    /// Returns the number of stored entries.
    ///
    /// A point-in-time snapshot; expired entries not yet swept are counted.
    pub fn len(&self) -> usize {
        self.segment.lock().len()
    }

    /// Returns `true` if the cache contains no entries.
    pub fn is_empty(&self) -> bool {
        self.segment.lock().is_empty()
    }

    /// Retrieves a value from the cache.
    ///
    /// Returns a **clone** of the value to avoid holding the lock. For operations
    /// that don't need ownership, use [`get_with()`](Self::get_with) instead.
    ///
    /// A hit moves the entry to the MRU position. An expired entry is removed
    /// and reported as a miss.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.lock().get(key).cloned()
    }

    /// Retrieves a value and applies a function to it while holding the lock.
    ///
    /// More efficient than `get()` when you only need to read from the value,
    /// as it avoids cloning. The lock is released after `f` returns, so `f`
    /// must not call back into this cache.
    pub fn get_with<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&V) -> R,
    {
        self.segment.lock().get(key).map(f)
    }

    /// Retrieves a mutable reference and applies a function to it.
    pub fn get_mut_with<Q, F, R>(&self, key: &Q, f: F) -> Option<R>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        F: FnOnce(&mut V) -> R,
    {
        self.segment.lock().get_mut(key).map(f)
    }

    /// Inserts a key-value pair into the cache.
    ///
    /// If the key exists, the value is replaced, moved to the MRU position and
    /// its TTL restarts. If the cache is full, the LRU entry is evicted.
    ///
    /// # Returns
    ///
    /// - `Some((key, old_value))` if the key existed
    /// - `Some((evicted_key, evicted_value))` if an entry was evicted
    /// - `None` if inserted with available capacity
    pub fn put(&self, key: K, value: V) -> Option<(K, V)> {
        self.segment.lock().put(key, value)
    }

    /// Removes a key, returning `true` if a live entry was dropped.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.lock().take(key).is_some()
    }

    /// Removes a key and returns its value if it was live.
    pub fn take<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.lock().take(key)
    }

    /// Checks if the cache holds a live entry for `key`.
    ///
    /// Unlike `get()`, this neither updates recency nor removes an expired
    /// entry.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.lock().contains_key(key)
    }

    /// Removes all entries, returning how many were dropped.
    pub fn clear(&self) -> usize {
        self.segment.lock().clear()
    }

    /// Drops every expired entry, returning how many were dropped.
    pub fn purge_expired(&self) -> usize {
        self.segment.lock().purge_expired()
    }

    /// Evicts `ceil(len * percent / 100)` entries, least recently used first.
    pub fn evict_fraction(&self, percent: f64) -> usize {
        self.segment.lock().evict_fraction(percent)
    }

    /// Keys ordered from least to most recently used.
    pub fn keys_lru(&self) -> Vec<K> {
        self.segment.lock().keys_lru()
    }
}

impl<K, V, S> CacheMetrics for ConcurrentLruCache<K, V, S>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
    S: BuildHasher + Send,
{
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.segment.lock().metrics().metrics()
    }

    fn algorithm_name(&self) -> &'static str {
        "ConcurrentTTL-LRU"
    }
}

impl<K, V, S> ManagedCache for ConcurrentLruCache<K, V, S>
where
    K: Hash + Eq + Clone + Send,
    V: Clone + Send,
    S: BuildHasher + Send,
{
    fn clear(&self) {
        ConcurrentLruCache::clear(self);
    }

    fn len(&self) -> Option<usize> {
        Some(ConcurrentLruCache::len(self))
    }

    fn evict_fraction(&self, percent: f64) -> usize {
        ConcurrentLruCache::evict_fraction(self, percent)
    }
}

impl<K, V, S> core::fmt::Debug for ConcurrentLruCache<K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ConcurrentLruCache")
            .field("segment", &*self.segment.lock())
            .finish()
    }
}
