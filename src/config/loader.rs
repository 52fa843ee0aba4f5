//! Configuration for the concurrent resource loader.
//!
//! # Examples
//!
//! ```
//! use adaptive_cache::config::{LoaderConfig, LruCacheConfig};
//! use std::num::NonZeroUsize;
//!
//! // At most two artifacts are produced at the same time.
//! let config = LoaderConfig::new(LruCacheConfig::new(64))
//!     .with_max_concurrent_loads(NonZeroUsize::new(2).unwrap());
//! assert_eq!(config.max_concurrent_loads.get(), 2);
//! ```

use super::LruCacheConfig;
use crate::error::ConfigError;
use core::fmt;
use std::num::NonZeroUsize;

/// Returns the default load concurrency based on available parallelism.
fn default_max_concurrent_loads() -> NonZeroUsize {
    let parallelism = std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(4)
        .clamp(1, 16);
    NonZeroUsize::new(parallelism).unwrap_or(NonZeroUsize::MIN)
}

/// Configuration for a [`ResourceLoader`](crate::loader::ResourceLoader).
///
/// # Fields
///
/// - `cache`: configuration of the backing TTL-LRU store.
/// - `max_concurrent_loads`: upper bound on producer invocations running at
///   the same time across all keys.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LoaderConfig {
    /// Backing store configuration.
    pub cache: LruCacheConfig,
    /// Global cap on simultaneous productions.
    pub max_concurrent_loads: NonZeroUsize,
}

impl LoaderConfig {
    /// Creates a loader config around the given store config, with the
    /// default concurrency cap (available parallelism, clamped to `1..=16`).
    #[must_use]
    pub fn new(cache: LruCacheConfig) -> Self {
        Self {
            cache,
            max_concurrent_loads: default_max_concurrent_loads(),
        }
    }

    /// Sets the global cap on simultaneous productions.
    #[must_use]
    pub fn with_max_concurrent_loads(mut self, max: NonZeroUsize) -> Self {
        self.max_concurrent_loads = max;
        self
    }

    /// Validates the backing store configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cache.validate()
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self::new(LruCacheConfig::default())
    }
}

impl fmt::Debug for LoaderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoaderConfig")
            .field("cache", &self.cache)
            .field("max_concurrent_loads", &self.max_concurrent_loads)
            .finish()
    }
}
