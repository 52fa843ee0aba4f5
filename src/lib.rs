#![doc = include_str!("../README.md")]
//!
//! ---
//!
//! # Code Reference
//!
//! ## Components
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────────┐
//! │                       AdaptiveCacheManager                         │
//! │   poll ─▶ MemorySampler ─▶ MemoryTier ─▶ clear / reclaim           │
//! │                   │ registered as Arc<dyn ManagedCache>            │
//! │        ┌──────────┴──────────────┐                                 │
//! │        ▼                         ▼                                 │
//! │  ResourceLoader ──────▶ ConcurrentLruCache ──▶ LruSegment          │
//! │  (single-flight,        (one global lock)      (TTL-LRU core)      │
//! │   permit pool)                                                     │
//! └────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! | Type | Description |
//! |------|-------------|
//! | [`LruCache`] | single-threaded TTL-LRU cache |
//! | [`ConcurrentLruCache`] | thread-safe TTL-LRU cache with global LRU order |
//! | [`ResourceLoader`] | coalescing, concurrency-limited loader over a concurrent cache |
//! | [`AdaptiveCacheManager`] | memory-pressure driven eviction across registered caches |
//!
//! ## Performance Characteristics
//!
//! | Operation | Cost |
//! |-----------|------|
//! | store `get` / `put` / `remove` | O(1) average, one lock |
//! | loader hit | one store lookup |
//! | loader miss | one store lookup, one in-flight map lookup, one task spawn |
//! | manager sweep | one `clear()` per registered cache |
//!
//! ## Code Examples
//!
//! ### TTL-LRU
//!
//! ```rust
//! use adaptive_cache::LruCache;
//! use adaptive_cache::config::LruCacheConfig;
//! use std::time::Duration;
//!
//! let config = LruCacheConfig::new(2).with_ttl(Duration::from_secs(30 * 60));
//! let mut cache = LruCache::init(config).unwrap();
//!
//! cache.put("a", 1);
//! cache.put("b", 2);
//! cache.get(&"a");      // "a" becomes most recently used
//! cache.put("c", 3);    // evicts "b"
//!
//! assert!(cache.get(&"b").is_none());
//! ```
//!
//! ### Loading With Coalescing
//!
//! ```rust
//! use adaptive_cache::config::{LoaderConfig, LruCacheConfig};
//! use adaptive_cache::ResourceLoader;
//! use std::convert::Infallible;
//! use std::num::NonZeroUsize;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let config = LoaderConfig::new(LruCacheConfig::new(128))
//!     .with_max_concurrent_loads(NonZeroUsize::new(4).unwrap());
//! let loader = ResourceLoader::new(config, |path: String| async move {
//!     // parse, type-check, ...
//!     Ok::<_, Infallible>(format!("artifact for {path}"))
//! })
//! .unwrap();
//!
//! let artifact = loader.get_or_load("src/lib.rs".to_string()).await.unwrap();
//! assert_eq!(artifact, "artifact for src/lib.rs");
//! # }
//! ```
//!
//! ### Memory-Pressure Eviction
//!
//! ```rust
//! use adaptive_cache::config::ManagerConfig;
//! use adaptive_cache::memory::{FixedMemorySampler, NoopReclaimer};
//! use adaptive_cache::{AdaptiveCacheManager, ConcurrentLruCache};
//! use std::sync::Arc;
//!
//! let sampler = Arc::new(FixedMemorySampler::new(90.0));
//! let manager = AdaptiveCacheManager::new(
//!     ManagerConfig::default(),
//!     sampler,
//!     Arc::new(NoopReclaimer),
//! )
//! .unwrap();
//!
//! let cache = Arc::new(ConcurrentLruCache::new(10));
//! cache.put(1, "one");
//! manager.register_cache("numbers", cache.clone()).unwrap();
//!
//! manager.poll_once();
//! assert!(cache.is_empty());
//! ```

/// Cache entry type.
///
/// Provides the `CacheEntry<K, V>` record holding a key, a value and the
/// timestamps used for recency and expiration.
pub mod entry;

/// Doubly linked list implementation with in-place editing capabilities.
///
/// **Note**: This module is internal infrastructure and should not be used directly
/// by library consumers. It exposes unsafe raw pointer operations that require
/// careful invariant maintenance.
pub(crate) mod list;

/// Time sources for expiration and bookkeeping.
pub mod clock;

/// Configuration structures for every component.
pub mod config;

/// Error types.
pub mod error;

/// TTL-aware Least Recently Used (LRU) cache implementation.
///
/// Provides a fixed-size cache that evicts the least recently used items when
/// the capacity is reached and treats entries older than the TTL as absent.
pub mod lru;

/// Concurrent cache implementations.
///
/// Provides the thread-safe TTL-LRU cache used by the loader.
pub mod concurrent;

/// Coalescing, concurrency-limited resource loader.
pub mod loader;

/// Memory sampling and heap reclamation hooks.
pub mod memory;

/// Memory-pressure driven cache manager.
pub mod manager;

/// Cache metrics system.
///
/// Every component reports its counters through a common interface.
pub mod metrics;

pub use concurrent::ConcurrentLruCache;
pub use entry::CacheEntry;
pub use error::{ConfigError, LoadError, RegistrationError, SampleError};
pub use loader::{Producer, ResourceLoader};
pub use lru::LruCache;
pub use manager::{AdaptiveCacheManager, ManagedCache, MemoryTier, PollOutcome};
