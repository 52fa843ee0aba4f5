//! Error types.
//!
//! | Error | Raised by | Retried? |
//! |-------|-----------|----------|
//! | [`ConfigError`] | constructors, `validate()` | no, fix the configuration |
//! | [`LoadError`] | [`ResourceLoader`](crate::loader::ResourceLoader) | next call starts a new load |
//! | [`RegistrationError`] | [`AdaptiveCacheManager::register_cache`](crate::manager::AdaptiveCacheManager::register_cache) | no |
//! | [`SampleError`] | [`MemorySampler`](crate::memory::MemorySampler) | next poll cycle |

use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Duration;

/// Invalid configuration detected at construction time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The manager poll interval must be non-zero.
    #[error("check interval must be greater than zero, got {0:?}")]
    ZeroCheckInterval(Duration),

    /// A percentage setting fell outside `[0, 100]`.
    #[error("{name} must be within [0, 100], got {value}")]
    PercentOutOfRange {
        /// Name of the offending setting.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },

    /// The critical threshold must be strictly above the high threshold.
    #[error("critical threshold ({critical}) must be greater than high threshold ({high})")]
    ThresholdOrder {
        /// Configured high-pressure threshold.
        high: f64,
        /// Configured critical-pressure threshold.
        critical: f64,
    },

    /// A TTL of zero would expire every entry on insertion.
    #[error("ttl must be greater than zero when set")]
    ZeroTtl,
}

/// A failed load, shared by every caller waiting on the same production.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LoadError {
    /// The producer returned an error.
    #[error("producer failed: {0}")]
    Producer(#[source] Arc<dyn StdError + Send + Sync + 'static>),

    /// The production task ended without a result (panic or runtime shutdown).
    #[error("load aborted: {0}")]
    Aborted(String),
}

impl LoadError {
    /// Wraps a producer error.
    pub fn producer<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        LoadError::Producer(Arc::new(err))
    }

    /// Returns `true` when the producer itself reported the failure.
    pub fn is_producer(&self) -> bool {
        matches!(self, LoadError::Producer(_))
    }
}

/// A cache could not be registered with the adaptive manager.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistrationError {
    /// Registration names must be non-empty.
    #[error("cache name must not be empty")]
    EmptyName,

    /// The manager has been disposed and no longer accepts caches.
    #[error("cache manager has been disposed")]
    Disposed,
}

/// Memory usage could not be sampled.
#[derive(Debug, thiserror::Error)]
pub enum SampleError {
    /// Reading the memory source failed.
    #[error("failed to read memory statistics: {0}")]
    Io(#[from] std::io::Error),

    /// The memory source did not contain the expected fields.
    #[error("malformed memory statistics: {0}")]
    Malformed(String),

    /// No memory source is available on this platform.
    #[error("memory sampling is not supported on this platform")]
    Unsupported,
}

/// Extracts a readable message from a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
