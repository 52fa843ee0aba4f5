//! Configuration for the TTL-aware Least Recently Used (LRU) cache.
//!
//! # Sizing Guidelines
//!
//! - **`capacity`**: maximum number of entries. Artifacts produced by an
//!   analysis pass are usually large, so size this by how many artifacts you
//!   can afford to keep resident rather than by a byte budget. A capacity of
//!   `0` is legal and turns the cache into a pass-through: every insertion is
//!   evicted immediately.
//! - **`ttl`**: how long a written value stays valid. `None` disables
//!   time-based expiration; entries then leave only through LRU eviction,
//!   explicit removal or a memory-pressure sweep.
//!
//! # Examples
//!
//! ```
//! use adaptive_cache::config::LruCacheConfig;
//! use adaptive_cache::LruCache;
//! use std::time::Duration;
//!
//! // Keep the 200 most recently used artifacts for at most half an hour.
//! let config = LruCacheConfig::new(200).with_ttl(Duration::from_secs(30 * 60));
//! let cache: LruCache<String, Vec<u8>> = LruCache::init(config).unwrap();
//! assert_eq!(cache.capacity(), 200);
//! ```

use crate::error::ConfigError;
use core::fmt;
use std::time::Duration;

/// Default number of entries.
pub const DEFAULT_CAPACITY: usize = 100;

/// Default time-to-live: 30 minutes.
pub const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

/// Configuration for an LRU cache with optional time-to-live.
///
/// # Fields
///
/// - `capacity`: maximum number of entries the cache holds.
/// - `ttl`: lifetime of a written value; `None` means no expiration.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LruCacheConfig {
    /// Maximum number of key-value pairs the cache can hold.
    pub capacity: usize,
    /// Lifetime of an entry after it is written.
    pub ttl: Option<Duration>,
}

impl LruCacheConfig {
    /// Creates a config with the given capacity and no TTL.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ttl: None,
        }
    }

    /// Sets the time-to-live.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Disables time-based expiration.
    #[must_use]
    pub fn without_ttl(mut self) -> Self {
        self.ttl = None;
        self
    }

    /// Rejects a zero TTL, which would make every entry dead on arrival.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.ttl {
            Some(ttl) if ttl.is_zero() => Err(ConfigError::ZeroTtl),
            _ => Ok(()),
        }
    }
}

impl Default for LruCacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            ttl: Some(DEFAULT_TTL),
        }
    }
}

impl fmt::Debug for LruCacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCacheConfig")
            .field("capacity", &self.capacity)
            .field("ttl", &self.ttl)
            .finish()
    }
}
