//! Configuration Module
//!
//! Configuration structures for every component of the crate. Each component
//! has its own dedicated struct with public fields, a `Default`, chainable
//! `with_*` setters and a `validate()` method. Constructors call `validate()`
//! eagerly, so an invalid configuration fails at construction and never at
//! runtime.
//!
//! | Config | Used by | Description |
//! |--------|---------|-------------|
//! | [`LruCacheConfig`] | [`LruCache`](crate::LruCache), [`ConcurrentLruCache`](crate::ConcurrentLruCache) | capacity and TTL |
//! | [`LoaderConfig`] | [`ResourceLoader`](crate::ResourceLoader) | store config plus load concurrency cap |
//! | [`ManagerConfig`] | [`AdaptiveCacheManager`](crate::AdaptiveCacheManager) | poll interval and pressure thresholds |
//!
//! # Examples
//!
//! ```
//! use adaptive_cache::config::{LoaderConfig, LruCacheConfig, ManagerConfig};
//! use std::num::NonZeroUsize;
//! use std::time::Duration;
//!
//! let loader = LoaderConfig::new(
//!     LruCacheConfig::new(500).with_ttl(Duration::from_secs(30 * 60)),
//! )
//! .with_max_concurrent_loads(NonZeroUsize::new(4).unwrap());
//! assert!(loader.validate().is_ok());
//!
//! let manager = ManagerConfig::default()
//!     .with_thresholds(75.0, 90.0)
//!     .with_check_interval(Duration::from_secs(10));
//! assert!(manager.validate().is_ok());
//! ```

pub mod loader;
pub mod lru;
pub mod manager;

pub use loader::LoaderConfig;
pub use lru::LruCacheConfig;
pub use manager::ManagerConfig;

use crate::error::ConfigError;

/// Checks that `value` lies within `[0, 100]`. NaN is rejected.
pub(crate) fn check_percent(name: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=100.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::PercentOutOfRange { name, value })
    }
}
