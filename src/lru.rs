//! TTL-aware Least Recently Used (LRU) Cache Implementation
//!
//! This module provides a capacity-bounded, time-aware LRU cache with O(1)
//! lookups, insertions, removals and evictions.
//!
//! # Algorithm
//!
//! Entries live in a recency list (most recently used at the front) and are
//! indexed by a hash map of node handles. A hit moves the entry to the front;
//! an insertion into a full cache evicts from the back. Ties between entries
//! never touched after insertion therefore resolve in insertion order, oldest
//! first.
//!
//! When a TTL is configured each entry carries an expiry deadline:
//!
//! - **Lazy expiration**: a lookup that finds an expired entry removes it and
//!   reports a miss. Expired entries are never resurrected.
//! - **Proactive sweep**: [`LruCache::purge_expired`] drops every expired
//!   entry in one pass.
//!
//! # Invariants
//!
//! - `len() <= capacity()` after every completed call.
//! - A capacity of `0` is legal: every `put` is evicted immediately.
//! - Replacing the value of an existing key never evicts a different key.
//!
//! # Performance Characteristics
//!
//! | Operation | Cost |
//! |-----------|------|
//! | `get` / `put` / `remove` | O(1) average |
//! | `purge_expired` | O(n) |
//! | `evict_fraction` | O(evicted) |
//!
//! # Thread Safety
//!
//! [`LruCache`] is not thread-safe. For shared access use
//! [`ConcurrentLruCache`](crate::ConcurrentLruCache), which wraps the same
//! algorithm in a single lock so that LRU order stays global.

use crate::clock::{Clock, SystemClock};
use crate::config::LruCacheConfig;
use crate::entry::CacheEntry;
use crate::error::ConfigError;
use crate::list::{Node, RecencyList};
use crate::metrics::{CacheMetrics, LruCacheMetrics};
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use core::ptr::NonNull;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "hashbrown")]
pub(crate) use hashbrown::DefaultHashBuilder;
#[cfg(feature = "hashbrown")]
use hashbrown::HashMap;

#[cfg(not(feature = "hashbrown"))]
pub(crate) use std::collections::hash_map::RandomState as DefaultHashBuilder;
#[cfg(not(feature = "hashbrown"))]
use std::collections::HashMap;

type EntryNode<K, V> = NonNull<Node<CacheEntry<K, V>>>;

/// Internal LRU segment containing the actual cache algorithm.
///
/// Shared between `LruCache` (single-threaded) and `ConcurrentLruCache`
/// (behind a mutex). All algorithm logic lives here.
///
/// # Safety
///
/// `map` holds raw node handles. They stay valid as long as:
/// - the handle was returned by `list.push_front`
/// - the node has not been removed from `list`
/// - the segment has not been dropped
///
/// Every code path that unlinks a node removes its map entry in the same call.
pub(crate) struct LruSegment<K, V, S = DefaultHashBuilder> {
    config: LruCacheConfig,
    list: RecencyList<CacheEntry<K, V>>,
    map: HashMap<K, EntryNode<K, V>, S>,
    clock: Arc<dyn Clock>,
    metrics: LruCacheMetrics,
}

// SAFETY: LruSegment owns all nodes its handles point to.
unsafe impl<K: Send, V: Send, S: Send> Send for LruSegment<K, V, S> {}

// SAFETY: all mutation requires &mut self; shared references only read.
unsafe impl<K: Sync, V: Sync, S: Sync> Sync for LruSegment<K, V, S> {}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> LruSegment<K, V, S> {
    pub(crate) fn with_hasher(
        config: LruCacheConfig,
        hash_builder: S,
        clock: Arc<dyn Clock>,
    ) -> Self {
        LruSegment {
            config,
            list: RecencyList::new(),
            map: HashMap::with_capacity_and_hasher(config.capacity.min(1024), hash_builder),
            clock,
            metrics: LruCacheMetrics::new(config.capacity),
        }
    }

    #[inline]
    pub(crate) fn cap(&self) -> usize {
        self.config.capacity
    }

    #[inline]
    pub(crate) fn ttl(&self) -> Option<Duration> {
        self.config.ttl
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub(crate) fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub(crate) fn metrics(&self) -> LruCacheMetrics {
        let mut snapshot = self.metrics.clone();
        snapshot.len = self.map.len();
        snapshot
    }

    /// Unlinks `node` and drops its map entry, returning the entry.
    ///
    /// # Safety
    ///
    /// `node` must be a live handle from `self.map`.
    unsafe fn detach(&mut self, node: EntryNode<K, V>) -> CacheEntry<K, V> {
        // SAFETY: caller guarantees `node` is linked into `self.list`.
        let entry = unsafe { self.list.remove(node) };
        self.map.remove(&entry.key);
        entry
    }

    /// Looks up a live entry, dropping it first if it has expired.
    fn lookup<Q>(&mut self, key: &Q, now: Instant) -> Option<EntryNode<K, V>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let node = match self.map.get(key).copied() {
            Some(node) => node,
            None => {
                self.metrics.core.record_miss();
                return None;
            }
        };
        // SAFETY: node comes from our map
        let expired = unsafe { node.as_ref() }.value().is_expired(now);
        if expired {
            // SAFETY: node comes from our map
            unsafe { self.detach(node) };
            self.metrics.core.record_expirations(1);
            self.metrics.core.record_miss();
            return None;
        }
        // SAFETY: node comes from our map and is still linked
        unsafe {
            self.list.move_to_front(node);
            (*node.as_ptr()).value_mut().touch(now);
        }
        self.metrics.core.record_hit();
        Some(node)
    }

    pub(crate) fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let now = self.clock.now();
        let node = self.lookup(key, now)?;
        // SAFETY: node is live and the returned borrow is tied to &mut self
        Some(unsafe { &(*node.as_ptr()).value().value })
    }

    pub(crate) fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let now = self.clock.now();
        let node = self.lookup(key, now)?;
        // SAFETY: node is live and the returned borrow is tied to &mut self
        Some(unsafe { &mut (*node.as_ptr()).value_mut().value })
    }

    /// Existence check that neither bumps recency nor removes expired entries.
    pub(crate) fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let now = self.clock.now();
        match self.map.get(key) {
            // SAFETY: node comes from our map
            Some(node) => !unsafe { node.as_ref() }.value().is_expired(now),
            None => false,
        }
    }

    /// Inserts or replaces, returning the displaced pair if any.
    ///
    /// The displaced pair is the previous value under the same key, or the
    /// least recently used entry evicted to make room.
    pub(crate) fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        let now = self.clock.now();
        let ttl = self.config.ttl;

        if let Some(&node) = self.map.get(&key) {
            // SAFETY: node comes from our map
            let old = unsafe {
                self.list.move_to_front(node);
                (*node.as_ptr()).value_mut().replace(value, now, ttl)
            };
            self.metrics.core.record_update();
            return Some((key, old));
        }

        self.metrics.core.record_insertion();
        if self.cap() == 0 {
            self.metrics.core.record_evictions(1);
            return Some((key, value));
        }

        let mut evicted = None;
        while self.map.len() >= self.cap() {
            let Some(entry) = self.list.pop_back() else {
                break;
            };
            self.map.remove(&entry.key);
            if entry.is_expired(now) {
                self.metrics.core.record_expirations(1);
            } else {
                self.metrics.core.record_evictions(1);
            }
            evicted = Some((entry.key, entry.value));
        }

        let node = self
            .list
            .push_front(CacheEntry::new(key.clone(), value, now, ttl));
        self.map.insert(key, node);
        debug_assert_eq!(self.list.len(), self.map.len());
        debug_assert!(self.list.len() <= self.cap());
        evicted
    }

    pub(crate) fn take<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let now = self.clock.now();
        let node = self.map.get(key).copied()?;
        // SAFETY: node comes from our map
        let entry = unsafe { self.detach(node) };
        if entry.is_expired(now) {
            self.metrics.core.record_expirations(1);
            None
        } else {
            self.metrics.core.record_removals(1);
            Some(entry.value)
        }
    }

    pub(crate) fn clear(&mut self) -> usize {
        let removed = self.map.len();
        self.map.clear();
        self.list.clear();
        debug_assert!(self.list.is_empty());
        self.metrics.core.record_removals(removed as u64);
        removed
    }

    pub(crate) fn purge_expired(&mut self) -> usize {
        if self.config.ttl.is_none() {
            return 0;
        }
        let now = self.clock.now();
        let Self { map, list, .. } = self;
        let before = map.len();
        map.retain(|_, node| {
            // SAFETY: every handle in the map is linked into `list`
            let expired = unsafe { node.as_ref() }.value().is_expired(now);
            if expired {
                // SAFETY: as above; the map entry is dropped by `retain`
                unsafe { list.remove(*node) };
            }
            !expired
        });
        let purged = before - map.len();
        self.metrics.core.record_expirations(purged as u64);
        purged
    }

    /// Evicts `ceil(len * percent / 100)` least recently used entries.
    pub(crate) fn evict_fraction(&mut self, percent: f64) -> usize {
        let percent = percent.clamp(0.0, 100.0);
        let target = ((self.map.len() as f64) * percent / 100.0).ceil() as usize;
        let mut evicted = 0;
        while evicted < target {
            let Some(tail) = self.list.back() else {
                break;
            };
            // SAFETY: `back` returns a handle linked into our list
            unsafe { self.detach(tail) };
            evicted += 1;
        }
        self.metrics.core.record_evictions(evicted as u64);
        evicted
    }

    /// Keys from least to most recently used, including expired ones.
    pub(crate) fn keys_lru(&self) -> Vec<K> {
        self.list.iter_lru().map(|entry| entry.key.clone()).collect()
    }
}

impl<K, V, S> core::fmt::Debug for LruSegment<K, V, S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LruSegment")
            .field("capacity", &self.config.capacity)
            .field("ttl", &self.config.ttl)
            .field("len", &self.map.len())
            .finish()
    }
}

/// A capacity-bounded LRU cache with optional per-entry time-to-live.
///
/// # Examples
///
/// ```
/// use adaptive_cache::config::LruCacheConfig;
/// use adaptive_cache::LruCache;
/// use std::time::Duration;
///
/// let config = LruCacheConfig::new(2).with_ttl(Duration::from_secs(30 * 60));
/// let mut cache = LruCache::init(config).unwrap();
///
/// cache.put("a", 1);
/// cache.put("b", 2);
/// cache.put("c", 3);   // "a" is the least recently used and gets evicted
///
/// assert_eq!(cache.get(&"a"), None);
/// assert_eq!(cache.get(&"b"), Some(&2));
/// assert_eq!(cache.get(&"c"), Some(&3));
/// ```
#[derive(Debug)]
pub struct LruCache<K, V, S = DefaultHashBuilder> {
    segment: LruSegment<K, V, S>,
}

impl<K: Hash + Eq + Clone, V> LruCache<K, V> {
    /// Creates a cache from a validated configuration, reading time from the
    /// system clock.
    pub fn init(config: LruCacheConfig) -> Result<Self, ConfigError> {
        Self::init_with_clock(config, Arc::new(SystemClock))
    }

    /// Creates a cache from a validated configuration with a custom clock.
    pub fn init_with_clock(
        config: LruCacheConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            segment: LruSegment::with_hasher(config, DefaultHashBuilder::default(), clock),
        })
    }

    /// Creates a cache with the given capacity and no TTL.
    pub fn new(capacity: usize) -> Self {
        Self {
            segment: LruSegment::with_hasher(
                LruCacheConfig::new(capacity),
                DefaultHashBuilder::default(),
                Arc::new(SystemClock),
            ),
        }
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> LruCache<K, V, S> {
    /// Creates a cache with a custom hash builder and clock.
    pub fn with_hasher(
        config: LruCacheConfig,
        hash_builder: S,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            segment: LruSegment::with_hasher(config, hash_builder, clock),
        })
    }

    /// Maximum number of entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.segment.cap()
    }

    /// Configured time-to-live.
    #[inline]
    pub fn ttl(&self) -> Option<Duration> {
        self.segment.ttl()
    }

    /// Number of stored entries, possibly including expired ones not yet
    /// swept.
    #[inline]
    pub fn len(&self) -> usize {
        self.segment.len()
    }

    /// Returns `true` if nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.segment.is_empty()
    }

    /// Returns the live value for `key` and marks it most recently used.
    #[inline]
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.get(key)
    }

    /// Mutable variant of [`get`](Self::get).
    #[inline]
    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.get_mut(key)
    }

    /// Returns `true` if a live entry exists, without touching recency.
    #[inline]
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.contains_key(key)
    }

    /// Inserts or replaces a value.
    ///
    /// # Returns
    ///
    /// - `Some((key, old_value))` if the key already existed
    /// - `Some((evicted_key, evicted_value))` if the insertion evicted the LRU entry
    ///   (with capacity 0 this is the pair just inserted)
    /// - `None` if there was room
    #[inline]
    pub fn put(&mut self, key: K, value: V) -> Option<(K, V)> {
        self.segment.put(key, value)
    }

    /// Removes `key`, returning `true` if a live entry was dropped.
    #[inline]
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.take(key).is_some()
    }

    /// Removes `key`, returning its value if it was live.
    #[inline]
    pub fn take<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.segment.take(key)
    }

    /// Removes every entry, returning how many were dropped.
    #[inline]
    pub fn clear(&mut self) -> usize {
        self.segment.clear()
    }

    /// Drops every expired entry, returning how many were dropped.
    #[inline]
    pub fn purge_expired(&mut self) -> usize {
        self.segment.purge_expired()
    }

    /// Evicts the given percentage of entries, least recently used first.
    #[inline]
    pub fn evict_fraction(&mut self, percent: f64) -> usize {
        self.segment.evict_fraction(percent)
    }

    /// Keys ordered from least to most recently used.
    pub fn keys_lru(&self) -> Vec<K> {
        self.segment.keys_lru()
    }
}

impl<K: Hash + Eq + Clone, V, S: BuildHasher> CacheMetrics for LruCache<K, V, S> {
    fn metrics(&self) -> BTreeMap<String, f64> {
        self.segment.metrics().metrics()
    }

    fn algorithm_name(&self) -> &'static str {
        "TTL-LRU"
    }
}
