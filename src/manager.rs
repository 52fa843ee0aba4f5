//! Adaptive Cache Manager
//!
//! A process-scoped coordinator that watches memory pressure and sheds cached
//! data across every registered cache when memory runs short.
//!
//! # How It Works
//!
//! Each poll cycle samples memory through a [`MemorySampler`], classifies the
//! usage into a [`MemoryTier`] and acts on it:
//!
//! | Tier | Condition | Action |
//! |------|-----------|--------|
//! | Normal | `usage < high` | refresh each registration's `last_touched` |
//! | High | `high <= usage < critical` | `clear()` every registered cache |
//! | Critical | `usage >= critical` | High sweep, then [`HeapReclaimer::reclaim`] |
//!
//! Sweeps are serialized by a dedicated cleanup lock taken with `try_lock`:
//! a cycle that finds a sweep already running skips instead of piling up. The
//! lock is never held by cache traffic, so normal reads and writes are never
//! blocked by it.
//!
//! A cache whose `clear()` panics is logged and counted; the remaining caches
//! are still cleared and the poll timer keeps running.
//!
//! # Polling
//!
//! [`AdaptiveCacheManager::new`] creates a manager that only polls when
//! [`poll_once`](AdaptiveCacheManager::poll_once) is called.
//! [`AdaptiveCacheManager::start`] additionally spawns a Tokio task that polls
//! every `check_interval` until the manager is disposed or dropped.
//!
//! # Example
//!
//! ```
//! use adaptive_cache::concurrent::ConcurrentLruCache;
//! use adaptive_cache::config::ManagerConfig;
//! use adaptive_cache::manager::{AdaptiveCacheManager, MemoryTier};
//! use adaptive_cache::memory::{FixedMemorySampler, NoopReclaimer};
//! use std::sync::Arc;
//!
//! let sampler = Arc::new(FixedMemorySampler::new(40.0));
//! let manager = AdaptiveCacheManager::new(
//!     ManagerConfig::default(),
//!     sampler.clone(),
//!     Arc::new(NoopReclaimer),
//! )
//! .unwrap();
//!
//! let cache = Arc::new(ConcurrentLruCache::new(100));
//! cache.put("ast", 1);
//! manager.register_cache("syntax-trees", cache.clone()).unwrap();
//!
//! assert_eq!(manager.poll_once().tier(), Some(MemoryTier::Normal));
//! assert_eq!(cache.len(), 1);
//!
//! sampler.set_percent(75.0);
//! assert_eq!(manager.poll_once().tier(), Some(MemoryTier::High));
//! assert!(cache.is_empty());
//! ```

use crate::clock::{Clock, SystemClock};
use crate::config::ManagerConfig;
use crate::error::{panic_message, ConfigError, RegistrationError};
use crate::memory::{HeapReclaimer, MemorySampler};
use crate::metrics::{CacheMetrics, ManagerMetrics};
use core::fmt;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// The capability the manager needs from a cache.
///
/// Only [`clear`](ManagedCache::clear) is required. Caches that can report
/// their size or evict selectively should override the other methods.
pub trait ManagedCache: Send + Sync {
    /// Drops every entry.
    fn clear(&self);

    /// Current number of entries, if known.
    fn len(&self) -> Option<usize> {
        None
    }

    /// Evicts roughly `percent` of the entries, returning how many were
    /// evicted. Defaults to a full clear.
    fn evict_fraction(&self, percent: f64) -> usize {
        let before = self.len().unwrap_or(0);
        if percent > 0.0 {
            self.clear();
            before
        } else {
            0
        }
    }
}

/// Memory pressure classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MemoryTier {
    /// Usage below the high threshold.
    Normal,
    /// Usage at or above the high threshold but below the critical one.
    High,
    /// Usage at or above the critical threshold.
    Critical,
}

impl MemoryTier {
    /// Classifies `usage_percent` against the two thresholds.
    pub fn classify(usage_percent: f64, high: f64, critical: f64) -> Self {
        if usage_percent >= critical {
            MemoryTier::Critical
        } else if usage_percent >= high {
            MemoryTier::High
        } else {
            MemoryTier::Normal
        }
    }
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryTier::Normal => "normal",
            MemoryTier::High => "high",
            MemoryTier::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// What a single poll cycle did.
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// The manager has been disposed; nothing was sampled.
    Disposed,
    /// Memory could not be sampled; the cycle was skipped.
    SampleFailed,
    /// Usage was normal; bookkeeping of `refreshed` registrations was updated.
    Normal {
        /// Sampled usage percentage.
        usage_percent: f64,
        /// Registrations whose `last_touched` was refreshed.
        refreshed: usize,
    },
    /// Another sweep held the cleanup lock; this cycle did nothing.
    SweepSkipped {
        /// The tier that would have triggered a sweep.
        tier: MemoryTier,
        /// Sampled usage percentage.
        usage_percent: f64,
    },
    /// Registered caches were cleared.
    Swept {
        /// `High` or `Critical`.
        tier: MemoryTier,
        /// Sampled usage percentage.
        usage_percent: f64,
        /// Caches cleared successfully.
        cleared: usize,
        /// Caches whose clear panicked.
        failed: usize,
        /// Whether heap reclamation was requested.
        reclaimed: bool,
    },
}

impl PollOutcome {
    /// The tier this cycle classified, if it got that far.
    pub fn tier(&self) -> Option<MemoryTier> {
        match self {
            PollOutcome::Disposed | PollOutcome::SampleFailed => None,
            PollOutcome::Normal { .. } => Some(MemoryTier::Normal),
            PollOutcome::SweepSkipped { tier, .. } | PollOutcome::Swept { tier, .. } => Some(*tier),
        }
    }
}

struct Registration {
    cache: Arc<dyn ManagedCache>,
    last_touched: Instant,
}

/// Polls memory pressure and clears registered caches when it runs high.
///
/// Cheap to share: wrap it in an `Arc` (as [`start`](Self::start) does) and
/// register caches from anywhere. Dropping the last reference disposes it.
pub struct AdaptiveCacheManager {
    config: ManagerConfig,
    sampler: Arc<dyn MemorySampler>,
    reclaimer: Arc<dyn HeapReclaimer>,
    clock: Arc<dyn Clock>,
    registry: RwLock<HashMap<String, Registration>>,
    cleanup: Mutex<()>,
    last_tier: Mutex<Option<MemoryTier>>,
    disposed: AtomicBool,
    shutdown: watch::Sender<bool>,
    metrics: ManagerMetrics,
}

impl AdaptiveCacheManager {
    /// Creates a manager that polls only when [`poll_once`](Self::poll_once)
    /// is called.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(
        config: ManagerConfig,
        sampler: Arc<dyn MemorySampler>,
        reclaimer: Arc<dyn HeapReclaimer>,
    ) -> Result<Self, ConfigError> {
        Self::with_clock(config, sampler, reclaimer, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new), reading time from `clock`.
    pub fn with_clock(
        config: ManagerConfig,
        sampler: Arc<dyn MemorySampler>,
        reclaimer: Arc<dyn HeapReclaimer>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let (shutdown, _) = watch::channel(false);
        Ok(Self {
            config,
            sampler,
            reclaimer,
            clock,
            registry: RwLock::new(HashMap::new()),
            cleanup: Mutex::new(()),
            last_tier: Mutex::new(None),
            disposed: AtomicBool::new(false),
            shutdown,
            metrics: ManagerMetrics::default(),
        })
    }

    /// Creates a manager and starts polling every `check_interval` on the
    /// current Tokio runtime. The first poll happens one interval after start.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn start(
        config: ManagerConfig,
        sampler: Arc<dyn MemorySampler>,
        reclaimer: Arc<dyn HeapReclaimer>,
    ) -> Result<Arc<Self>, ConfigError> {
        let manager = Arc::new(Self::new(config, sampler, reclaimer)?);
        manager.spawn_monitor();
        Ok(manager)
    }

    /// Spawns the background poll task for this manager.
    ///
    /// The task holds only a weak reference, so it never keeps the manager
    /// alive. It stops on [`dispose`](Self::dispose) or when the manager is
    /// dropped.
    ///
    /// # Panics
    ///
    /// Panics if called outside a Tokio runtime.
    pub fn spawn_monitor(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let period = self.config.check_interval;
        let shutdown = self.shutdown.subscribe();
        let manager = Arc::downgrade(self);
        info!(
            interval = ?period,
            high = self.config.high_threshold,
            critical = self.config.critical_threshold,
            "memory monitor started"
        );
        tokio::spawn(run_monitor(manager, period, shutdown))
    }

    /// The validated configuration.
    pub fn config(&self) -> &ManagerConfig {
        &self.config
    }

    /// Registers `cache` under `name`, replacing any earlier registration of
    /// the same name.
    ///
    /// # Errors
    ///
    /// - [`RegistrationError::EmptyName`] if `name` is empty or whitespace
    /// - [`RegistrationError::Disposed`] after [`dispose`](Self::dispose)
    pub fn register_cache(
        &self,
        name: impl Into<String>,
        cache: Arc<dyn ManagedCache>,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        let registration = Registration {
            cache,
            last_touched: self.clock.now(),
        };

        let mut registry = self.registry.write();
        // Checked under the lock so a concurrent dispose cannot miss this entry.
        if self.is_disposed() {
            return Err(RegistrationError::Disposed);
        }
        let replaced = registry.insert(name.clone(), registration).is_some();
        drop(registry);

        if replaced {
            debug!(cache = %name, "cache registration replaced");
        } else {
            debug!(cache = %name, "cache registered");
        }
        Ok(())
    }

    /// Removes the registration for `name`. Returns `true` if one existed.
    pub fn unregister_cache(&self, name: &str) -> bool {
        let removed = self.registry.write().remove(name).is_some();
        if removed {
            debug!(cache = %name, "cache unregistered");
        }
        removed
    }

    /// Number of registered caches.
    pub fn registered_cache_count(&self) -> usize {
        self.registry.read().len()
    }

    /// Returns `true` if a cache is registered under `name`.
    pub fn is_cache_registered(&self, name: &str) -> bool {
        self.registry.read().contains_key(name)
    }

    /// When the registration for `name` was created or last refreshed by a
    /// normal-pressure poll.
    pub fn last_touched(&self, name: &str) -> Option<Instant> {
        self.registry.read().get(name).map(|r| r.last_touched)
    }

    /// Registered names in sorted order.
    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.registry.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// The tier classified by the most recent successful poll.
    pub fn last_tier(&self) -> Option<MemoryTier> {
        *self.last_tier.lock()
    }

    /// Runs one full poll cycle: sample, classify, act.
    pub fn poll_once(&self) -> PollOutcome {
        if self.is_disposed() {
            return PollOutcome::Disposed;
        }
        ManagerMetrics::add(&self.metrics.polls, 1);

        let usage = match catch_unwind(AssertUnwindSafe(|| self.sampler.sample())) {
            Ok(Ok(usage)) => usage,
            Ok(Err(err)) => {
                ManagerMetrics::add(&self.metrics.sample_failures, 1);
                warn!(error = %err, "memory sampling failed, skipping cycle");
                return PollOutcome::SampleFailed;
            }
            Err(payload) => {
                ManagerMetrics::add(&self.metrics.sample_failures, 1);
                warn!(panic = %panic_message(payload.as_ref()), "memory sampler panicked, skipping cycle");
                return PollOutcome::SampleFailed;
            }
        };
        let usage_percent = usage.percent();
        let tier = MemoryTier::classify(
            usage_percent,
            self.config.high_threshold,
            self.config.critical_threshold,
        );
        self.record_tier(tier, usage_percent);

        match tier {
            MemoryTier::Normal => {
                ManagerMetrics::add(&self.metrics.normal_polls, 1);
                let refreshed = self.touch_all();
                debug!(usage = usage_percent, refreshed, "memory usage normal");
                PollOutcome::Normal {
                    usage_percent,
                    refreshed,
                }
            }
            MemoryTier::High | MemoryTier::Critical => {
                let counter = if tier == MemoryTier::High {
                    &self.metrics.high_polls
                } else {
                    &self.metrics.critical_polls
                };
                ManagerMetrics::add(counter, 1);
                self.sweep(tier, usage_percent)
            }
        }
    }

    /// Evicts `cleanup_percentage` of the entries of every registered cache,
    /// least valuable first where the cache supports it. Returns the total
    /// number of entries evicted.
    ///
    /// Runs under the cleanup lock; returns 0 without trimming if a sweep is
    /// already in progress.
    pub fn trim_all(&self) -> usize {
        if self.is_disposed() {
            return 0;
        }
        let Some(_guard) = self.cleanup.try_lock() else {
            ManagerMetrics::add(&self.metrics.skipped_sweeps, 1);
            debug!("trim skipped, another sweep is running");
            return 0;
        };

        let percent = self.config.cleanup_percentage;
        let mut trimmed = 0;
        for (name, cache) in self.snapshot() {
            match catch_unwind(AssertUnwindSafe(|| cache.evict_fraction(percent))) {
                Ok(evicted) => {
                    debug!(cache = %name, evicted, "cache trimmed");
                    trimmed += evicted;
                }
                Err(payload) => {
                    ManagerMetrics::add(&self.metrics.clear_failures, 1);
                    warn!(cache = %name, panic = %panic_message(payload.as_ref()), "cache trim panicked");
                }
            }
        }
        ManagerMetrics::add(&self.metrics.entries_trimmed, trimmed as u64);
        info!(percent, trimmed, "trimmed registered caches");
        trimmed
    }

    /// Stops the background poll task and releases every registration.
    ///
    /// Idempotent: only the first call has any effect.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.shutdown.send_replace(true);
        let released = {
            let mut registry = self.registry.write();
            let released = registry.len();
            registry.clear();
            released
        };
        info!(released, "adaptive cache manager disposed");
    }

    /// Returns `true` once [`dispose`](Self::dispose) has run.
    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Counters describing the manager's activity.
    pub fn stats(&self) -> &ManagerMetrics {
        &self.metrics
    }

    fn record_tier(&self, tier: MemoryTier, usage_percent: f64) {
        let previous = self.last_tier.lock().replace(tier);
        if previous != Some(tier) {
            info!(
                tier = %tier,
                previous = ?previous,
                usage = usage_percent,
                "memory tier changed"
            );
        }
    }

    fn snapshot(&self) -> Vec<(String, Arc<dyn ManagedCache>)> {
        self.registry
            .read()
            .iter()
            .map(|(name, r)| (name.clone(), Arc::clone(&r.cache)))
            .collect()
    }

    fn touch_all(&self) -> usize {
        let now = self.clock.now();
        let mut registry = self.registry.write();
        for registration in registry.values_mut() {
            registration.last_touched = now;
        }
        registry.len()
    }

    fn sweep(&self, tier: MemoryTier, usage_percent: f64) -> PollOutcome {
        let Some(_guard) = self.cleanup.try_lock() else {
            ManagerMetrics::add(&self.metrics.skipped_sweeps, 1);
            debug!(tier = %tier, "sweep skipped, another sweep is running");
            return PollOutcome::SweepSkipped {
                tier,
                usage_percent,
            };
        };

        let mut cleared = 0;
        let mut failed = 0;
        for (name, cache) in self.snapshot() {
            match catch_unwind(AssertUnwindSafe(|| cache.clear())) {
                Ok(()) => cleared += 1,
                Err(payload) => {
                    failed += 1;
                    warn!(cache = %name, panic = %panic_message(payload.as_ref()), "cache clear panicked");
                }
            }
        }
        ManagerMetrics::add(&self.metrics.caches_cleared, cleared as u64);
        ManagerMetrics::add(&self.metrics.clear_failures, failed as u64);

        let reclaimed = tier == MemoryTier::Critical;
        if reclaimed {
            ManagerMetrics::add(&self.metrics.reclaim_requests, 1);
            if let Err(payload) = catch_unwind(AssertUnwindSafe(|| self.reclaimer.reclaim())) {
                warn!(panic = %panic_message(payload.as_ref()), "heap reclaimer panicked");
            }
        }

        info!(
            tier = %tier,
            usage = usage_percent,
            cleared,
            failed,
            reclaimed,
            "memory pressure sweep finished"
        );
        PollOutcome::Swept {
            tier,
            usage_percent,
            cleared,
            failed,
            reclaimed,
        }
    }
}

async fn run_monitor(
    manager: Weak<AdaptiveCacheManager>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(manager) = manager.upgrade() else {
                    break;
                };
                if manager.poll_once() == PollOutcome::Disposed {
                    break;
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    debug!("memory monitor stopped");
}

impl CacheMetrics for AdaptiveCacheManager {
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.metrics.metrics();
        metrics.insert(
            "registered_caches".to_string(),
            self.registered_cache_count() as f64,
        );
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        self.metrics.algorithm_name()
    }
}

impl Drop for AdaptiveCacheManager {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for AdaptiveCacheManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdaptiveCacheManager")
            .field("config", &self.config)
            .field("registered", &self.registered_cache_count())
            .field("last_tier", &self.last_tier())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::memory::{FixedMemorySampler, NoopReclaimer};
    use std::sync::atomic::AtomicUsize;

    #[derive(Default)]
    struct CountingCache {
        clears: AtomicUsize,
    }

    impl ManagedCache for CountingCache {
        fn clear(&self) {
            self.clears.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct PanickingCache;

    impl ManagedCache for PanickingCache {
        fn clear(&self) {
            panic!("clear exploded");
        }
    }

    fn manager_at(percent: f64) -> (AdaptiveCacheManager, Arc<FixedMemorySampler>) {
        let sampler = Arc::new(FixedMemorySampler::new(percent));
        let manager = AdaptiveCacheManager::new(
            ManagerConfig::default(),
            sampler.clone(),
            Arc::new(NoopReclaimer),
        )
        .unwrap();
        (manager, sampler)
    }

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(MemoryTier::classify(69.9, 70.0, 85.0), MemoryTier::Normal);
        assert_eq!(MemoryTier::classify(70.0, 70.0, 85.0), MemoryTier::High);
        assert_eq!(MemoryTier::classify(84.9, 70.0, 85.0), MemoryTier::High);
        assert_eq!(MemoryTier::classify(85.0, 70.0, 85.0), MemoryTier::Critical);
        assert_eq!(MemoryTier::classify(100.0, 70.0, 85.0), MemoryTier::Critical);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ManagerConfig::default().with_thresholds(90.0, 80.0);
        let result = AdaptiveCacheManager::new(
            config,
            Arc::new(FixedMemorySampler::new(0.0)),
            Arc::new(NoopReclaimer),
        );
        assert!(matches!(result, Err(ConfigError::ThresholdOrder { .. })));
    }

    #[test]
    fn test_register_rejects_blank_names() {
        let (manager, _) = manager_at(10.0);
        let cache = Arc::new(CountingCache::default());
        assert_eq!(
            manager.register_cache("", cache.clone()),
            Err(RegistrationError::EmptyName)
        );
        assert_eq!(
            manager.register_cache("  ", cache),
            Err(RegistrationError::EmptyName)
        );
        assert_eq!(manager.registered_cache_count(), 0);
    }

    #[test]
    fn test_last_registration_wins() {
        let (manager, sampler) = manager_at(10.0);
        let first = Arc::new(CountingCache::default());
        let second = Arc::new(CountingCache::default());
        manager.register_cache("ast", first.clone()).unwrap();
        manager.register_cache("ast", second.clone()).unwrap();
        assert_eq!(manager.registered_cache_count(), 1);

        sampler.set_percent(75.0);
        manager.poll_once();
        assert_eq!(first.clears.load(Ordering::SeqCst), 0);
        assert_eq!(second.clears.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_normal_refreshes_last_touched() {
        let clock = ManualClock::new();
        let manager = AdaptiveCacheManager::with_clock(
            ManagerConfig::default(),
            Arc::new(FixedMemorySampler::new(20.0)),
            Arc::new(NoopReclaimer),
            Arc::new(clock.clone()),
        )
        .unwrap();
        let cache = Arc::new(CountingCache::default());
        manager.register_cache("types", cache.clone()).unwrap();
        let registered_at = manager.last_touched("types").unwrap();

        clock.advance(Duration::from_secs(30));
        let outcome = manager.poll_once();
        assert_eq!(
            outcome,
            PollOutcome::Normal {
                usage_percent: 20.0,
                refreshed: 1
            }
        );
        assert_eq!(
            manager.last_touched("types").unwrap() - registered_at,
            Duration::from_secs(30)
        );
        assert_eq!(cache.clears.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_sweep_skipped_while_cleanup_lock_held() {
        let (manager, _) = manager_at(90.0);
        let cache = Arc::new(CountingCache::default());
        manager.register_cache("ast", cache.clone()).unwrap();

        let guard = manager.cleanup.lock();
        assert!(matches!(
            manager.poll_once(),
            PollOutcome::SweepSkipped {
                tier: MemoryTier::Critical,
                ..
            }
        ));
        assert_eq!(manager.trim_all(), 0);
        drop(guard);

        assert_eq!(cache.clears.load(Ordering::SeqCst), 0);
        assert_eq!(manager.stats().skipped_sweeps(), 2);
    }

    #[test]
    fn test_panicking_cache_does_not_stop_sweep() {
        let (manager, _) = manager_at(75.0);
        let healthy = Arc::new(CountingCache::default());
        manager.register_cache("bad", Arc::new(PanickingCache)).unwrap();
        manager.register_cache("good", healthy.clone()).unwrap();

        let outcome = manager.poll_once();
        assert!(matches!(
            outcome,
            PollOutcome::Swept {
                cleared: 1,
                failed: 1,
                reclaimed: false,
                ..
            }
        ));
        assert_eq!(healthy.clears.load(Ordering::SeqCst), 1);
        assert_eq!(manager.stats().clear_failures(), 1);
    }

    #[test]
    fn test_sample_failure_skips_cycle() {
        let (manager, sampler) = manager_at(90.0);
        let cache = Arc::new(CountingCache::default());
        manager.register_cache("ast", cache.clone()).unwrap();
        sampler.set_unavailable();

        assert_eq!(manager.poll_once(), PollOutcome::SampleFailed);
        assert_eq!(cache.clears.load(Ordering::SeqCst), 0);
        assert_eq!(manager.stats().sample_failures(), 1);
        assert_eq!(manager.last_tier(), None);
    }

    #[test]
    fn test_default_evict_fraction_clears() {
        struct Counted(AtomicUsize);
        impl ManagedCache for Counted {
            fn clear(&self) {
                self.0.store(0, Ordering::SeqCst);
            }
            fn len(&self) -> Option<usize> {
                Some(self.0.load(Ordering::SeqCst))
            }
        }

        let cache = Counted(AtomicUsize::new(12));
        assert_eq!(cache.evict_fraction(0.0), 0);
        assert_eq!(cache.evict_fraction(10.0), 12);
        assert_eq!(cache.len(), Some(0));
    }

    #[test]
    fn test_dispose_is_idempotent() {
        let (manager, _) = manager_at(90.0);
        manager
            .register_cache("ast", Arc::new(CountingCache::default()))
            .unwrap();
        manager.dispose();
        manager.dispose();
        assert!(manager.is_disposed());
        assert_eq!(manager.registered_cache_count(), 0);
        assert_eq!(manager.poll_once(), PollOutcome::Disposed);
        assert_eq!(
            manager.register_cache("late", Arc::new(CountingCache::default())),
            Err(RegistrationError::Disposed)
        );
    }

    #[test]
    fn test_tier_transitions_tracked() {
        let (manager, sampler) = manager_at(10.0);
        manager.poll_once();
        assert_eq!(manager.last_tier(), Some(MemoryTier::Normal));
        sampler.set_percent(86.0);
        manager.poll_once();
        assert_eq!(manager.last_tier(), Some(MemoryTier::Critical));
        assert_eq!(manager.stats().normal_polls(), 1);
        assert_eq!(manager.stats().critical_polls(), 1);
        assert_eq!(manager.stats().reclaim_requests(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_background_monitor_stops_on_dispose() {
        let sampler = Arc::new(FixedMemorySampler::new(10.0));
        let config = ManagerConfig::default().with_check_interval(Duration::from_secs(1));
        let manager =
            AdaptiveCacheManager::start(config, sampler.clone(), Arc::new(NoopReclaimer)).unwrap();

        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(sampler.samples_taken(), 3);

        manager.dispose();
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(sampler.samples_taken(), 3);
    }
}
