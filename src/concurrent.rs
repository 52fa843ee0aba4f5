//! Concurrent Cache Implementations
//!
//! Thread-safe wrappers around the single-threaded algorithm cores.
//!
//! # Architecture
//!
//! The algorithm core lives in a segment type shared with the single-threaded
//! cache. The concurrent wrapper holds exactly one segment behind a
//! `parking_lot::Mutex`, so eviction order is global: a more recently used
//! entry is never evicted before a less recently used one, no matter which
//! thread touched it.
//!
//! ## Why Mutex Instead of RwLock?
//!
//! Every `get()` mutates internal state: a hit moves the entry to the front of
//! the recency list, and a lookup of an expired entry deletes it. Since `get()`
//! is inherently a write, `RwLock` would buy nothing; `parking_lot::Mutex`
//! has less bookkeeping.
//!
//! ## Why One Lock?
//!
//! Striping keys across several independently locked segments scales better
//! but makes LRU order per-segment: an entry could be evicted from one segment
//! while another segment holds older entries. Cached artifacts here are
//! expensive to rebuild, so the cache keeps strict recency and relies on the
//! loader's request coalescing to keep the lock short and uncontended.
//!
//! # Available Concurrent Caches
//!
//! | Type | Description |
//! |------|-------------|
//! | [`ConcurrentLruCache`] | Thread-safe TTL-aware LRU cache |
//!
//! # Zero-Copy Access
//!
//! `get()` clones the value so the lock is released before the caller uses
//! it. When a clone is expensive, `get_with()` runs a closure on the value
//! while the lock is held:
//!
//! ```
//! use adaptive_cache::concurrent::ConcurrentLruCache;
//!
//! let cache = ConcurrentLruCache::new(16);
//! cache.put("report".to_string(), vec![0u8; 4096]);
//! assert_eq!(cache.get_with("report", |bytes| bytes.len()), Some(4096));
//! ```

mod lru;

pub use self::lru::ConcurrentLruCache;
