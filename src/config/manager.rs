//! Configuration for the adaptive cache manager.
//!
//! Thresholds and the cleanup percentage are expressed as percentages of
//! total memory in `[0, 100]`.
//!
//! | Usage | Tier | Action |
//! |-------|------|--------|
//! | `< high_threshold` | Normal | refresh bookkeeping only |
//! | `>= high_threshold` and `< critical_threshold` | High | clear every registered cache |
//! | `>= critical_threshold` | Critical | clear every registered cache and request heap reclamation |

use super::check_percent;
use crate::error::ConfigError;
use core::fmt;
use std::time::Duration;

/// Configuration for an [`AdaptiveCacheManager`](crate::manager::AdaptiveCacheManager).
#[derive(Clone, Copy, PartialEq)]
pub struct ManagerConfig {
    /// How often memory usage is sampled.
    pub check_interval: Duration,
    /// Usage percentage at which caches start being cleared.
    pub high_threshold: f64,
    /// Usage percentage at which heap reclamation is also requested.
    pub critical_threshold: f64,
    /// Share of entries [`trim_all`](crate::manager::AdaptiveCacheManager::trim_all)
    /// evicts from each registered cache.
    pub cleanup_percentage: f64,
}

impl ManagerConfig {
    /// Sets the poll interval.
    #[must_use]
    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Sets the high and critical thresholds.
    #[must_use]
    pub fn with_thresholds(mut self, high: f64, critical: f64) -> Self {
        self.high_threshold = high;
        self.critical_threshold = critical;
        self
    }

    /// Sets the trim percentage.
    #[must_use]
    pub fn with_cleanup_percentage(mut self, percentage: f64) -> Self {
        self.cleanup_percentage = percentage;
        self
    }

    /// Checks every constraint, reporting the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.check_interval.is_zero() {
            return Err(ConfigError::ZeroCheckInterval(self.check_interval));
        }
        check_percent("high_threshold", self.high_threshold)?;
        check_percent("critical_threshold", self.critical_threshold)?;
        if self.critical_threshold <= self.high_threshold {
            return Err(ConfigError::ThresholdOrder {
                high: self.high_threshold,
                critical: self.critical_threshold,
            });
        }
        check_percent("cleanup_percentage", self.cleanup_percentage)
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(30),
            high_threshold: 70.0,
            critical_threshold: 85.0,
            cleanup_percentage: 25.0,
        }
    }
}

impl fmt::Debug for ManagerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManagerConfig")
            .field("check_interval", &self.check_interval)
            .field("high_threshold", &self.high_threshold)
            .field("critical_threshold", &self.critical_threshold)
            .field("cleanup_percentage", &self.cleanup_percentage)
            .finish()
    }
}
