//! Adaptive Manager Tests
//!
//! Drives the manager with a `FixedMemorySampler` so every memory tier can be
//! reached deterministically, and with real stores and loaders registered.

use adaptive_cache::config::{LoaderConfig, LruCacheConfig, ManagerConfig};
use adaptive_cache::memory::{
    FixedMemorySampler, HeapReclaimer, MemorySampler, MemoryUsage, NoopReclaimer,
};
use adaptive_cache::SampleError;
use adaptive_cache::metrics::CacheMetrics;
use adaptive_cache::{
    AdaptiveCacheManager, ConcurrentLruCache, ConfigError, ManagedCache, MemoryTier, PollOutcome,
    RegistrationError, ResourceLoader,
};
use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct CountingReclaimer {
    calls: AtomicUsize,
}

impl HeapReclaimer for CountingReclaimer {
    fn reclaim(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

struct ExplodingCache;

impl ManagedCache for ExplodingCache {
    fn clear(&self) {
        panic!("cache backend unavailable");
    }
}

struct Fixture {
    manager: AdaptiveCacheManager,
    sampler: Arc<FixedMemorySampler>,
    reclaimer: Arc<CountingReclaimer>,
}

fn fixture(percent: f64) -> Fixture {
    let sampler = Arc::new(FixedMemorySampler::new(percent));
    let reclaimer = Arc::new(CountingReclaimer::default());
    let manager =
        AdaptiveCacheManager::new(ManagerConfig::default(), sampler.clone(), reclaimer.clone())
            .unwrap();
    Fixture {
        manager,
        sampler,
        reclaimer,
    }
}

fn filled_store(entries: usize) -> Arc<ConcurrentLruCache<usize, usize>> {
    let store = Arc::new(ConcurrentLruCache::new(entries.max(1)));
    for i in 0..entries {
        store.put(i, i);
    }
    store
}

#[test]
fn normal_pressure_keeps_entries() {
    let f = fixture(50.0);
    let store = filled_store(10);
    f.manager.register_cache("store", store.clone()).unwrap();

    let outcome = f.manager.poll_once();
    assert_eq!(outcome.tier(), Some(MemoryTier::Normal));
    assert_eq!(store.len(), 10);
    assert_eq!(f.reclaimer.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn high_pressure_clears_every_cache_without_reclaim() {
    let f = fixture(75.0);
    let first = filled_store(10);
    let second = filled_store(3);
    f.manager.register_cache("first", first.clone()).unwrap();
    f.manager.register_cache("second", second.clone()).unwrap();

    let outcome = f.manager.poll_once();
    assert_eq!(
        outcome,
        PollOutcome::Swept {
            tier: MemoryTier::High,
            usage_percent: 75.0,
            cleared: 2,
            failed: 0,
            reclaimed: false,
        }
    );
    assert!(first.is_empty());
    assert!(second.is_empty());
    assert_eq!(f.reclaimer.calls.load(Ordering::SeqCst), 0);
}

#[test]
fn critical_pressure_clears_and_requests_reclaim() {
    let f = fixture(95.0);
    let store = filled_store(10);
    f.manager.register_cache("store", store.clone()).unwrap();

    let outcome = f.manager.poll_once();
    assert_eq!(outcome.tier(), Some(MemoryTier::Critical));
    assert!(store.is_empty());
    assert_eq!(f.reclaimer.calls.load(Ordering::SeqCst), 1);
}

#[test]
fn tiers_follow_changing_pressure() {
    let f = fixture(10.0);
    let store = filled_store(4);
    f.manager.register_cache("store", store.clone()).unwrap();

    assert_eq!(f.manager.poll_once().tier(), Some(MemoryTier::Normal));
    assert_eq!(store.len(), 4);

    f.sampler.set_percent(85.0);
    assert_eq!(f.manager.poll_once().tier(), Some(MemoryTier::Critical));
    assert!(store.is_empty());

    store.put(1, 1);
    f.sampler.set_percent(69.9);
    assert_eq!(f.manager.poll_once().tier(), Some(MemoryTier::Normal));
    assert_eq!(store.len(), 1);

    let stats = f.manager.stats();
    assert_eq!(stats.polls(), 3);
    assert_eq!(stats.normal_polls(), 2);
    assert_eq!(stats.critical_polls(), 1);
}

#[tokio::test]
async fn loaders_are_cleared_like_stores() {
    let f = fixture(80.0);
    let loader = ResourceLoader::new(
        LoaderConfig::new(LruCacheConfig::new(16)),
        |key: u32| async move { Ok::<_, Infallible>(key * 10) },
    )
    .unwrap();
    loader.get_or_load(1).await.unwrap();
    loader.get_or_load(2).await.unwrap();
    f.manager
        .register_cache("loader", Arc::new(loader.clone()))
        .unwrap();

    f.manager.poll_once();
    assert!(loader.store().is_empty());
    assert_eq!(loader.get_or_load(1).await.unwrap(), 10);
}

#[test]
fn panicking_cache_is_isolated() {
    let f = fixture(90.0);
    let before = filled_store(5);
    let after = filled_store(5);
    f.manager.register_cache("a-before", before.clone()).unwrap();
    f.manager
        .register_cache("b-exploding", Arc::new(ExplodingCache))
        .unwrap();
    f.manager.register_cache("c-after", after.clone()).unwrap();

    let outcome = f.manager.poll_once();
    assert!(matches!(
        outcome,
        PollOutcome::Swept {
            cleared: 2,
            failed: 1,
            reclaimed: true,
            ..
        }
    ));
    assert!(before.is_empty());
    assert!(after.is_empty());
    assert_eq!(f.reclaimer.calls.load(Ordering::SeqCst), 1);

    // The manager keeps working on the next cycle.
    after.put(1, 1);
    f.manager.poll_once();
    assert!(after.is_empty());
    assert_eq!(f.manager.stats().clear_failures(), 2);
}

#[test]
fn trim_all_evicts_a_share_of_each_cache() {
    let sampler = Arc::new(FixedMemorySampler::new(10.0));
    let manager = AdaptiveCacheManager::new(
        ManagerConfig::default().with_cleanup_percentage(25.0),
        sampler,
        Arc::new(NoopReclaimer),
    )
    .unwrap();
    let big = filled_store(20);
    let small = filled_store(2);
    manager.register_cache("big", big.clone()).unwrap();
    manager.register_cache("small", small.clone()).unwrap();

    // ceil(20 * 0.25) = 5, ceil(2 * 0.25) = 1
    assert_eq!(manager.trim_all(), 6);
    assert_eq!(big.len(), 15);
    assert_eq!(small.len(), 1);
    // The least recently used keys go first.
    assert!(!big.contains_key(&0));
    assert!(big.contains_key(&19));
    assert_eq!(manager.metrics()["entries_trimmed"], 6.0);
}

#[test]
fn registration_rules() {
    let f = fixture(10.0);
    assert_eq!(
        f.manager.register_cache("", filled_store(1)),
        Err(RegistrationError::EmptyName)
    );

    f.manager.register_cache("ast", filled_store(1)).unwrap();
    f.manager.register_cache("types", filled_store(1)).unwrap();
    f.manager.register_cache("ast", filled_store(2)).unwrap();
    assert_eq!(f.manager.registered_cache_count(), 2);
    assert_eq!(f.manager.registered_names(), vec!["ast", "types"]);
    assert!(f.manager.is_cache_registered("types"));

    assert!(f.manager.unregister_cache("types"));
    assert!(!f.manager.unregister_cache("types"));
    assert!(!f.manager.is_cache_registered("types"));
    assert!(f.manager.last_touched("ast").is_some());
    assert!(f.manager.last_touched("types").is_none());
}

#[test]
fn dispose_is_idempotent_and_final() {
    let f = fixture(90.0);
    let store = filled_store(3);
    f.manager.register_cache("store", store.clone()).unwrap();

    f.manager.dispose();
    f.manager.dispose();
    assert!(f.manager.is_disposed());
    assert_eq!(f.manager.registered_cache_count(), 0);
    assert_eq!(f.manager.poll_once(), PollOutcome::Disposed);
    assert_eq!(f.manager.trim_all(), 0);
    assert_eq!(store.len(), 3);
    assert_eq!(
        f.manager.register_cache("late", filled_store(1)),
        Err(RegistrationError::Disposed)
    );
}

#[test]
fn invalid_configuration_fails_fast() {
    let cases = [
        ManagerConfig::default().with_check_interval(Duration::ZERO),
        ManagerConfig::default().with_thresholds(-1.0, 85.0),
        ManagerConfig::default().with_thresholds(70.0, 101.0),
        ManagerConfig::default().with_thresholds(80.0, 80.0),
        ManagerConfig::default().with_cleanup_percentage(150.0),
    ];
    for config in cases {
        let result = AdaptiveCacheManager::new(
            config,
            Arc::new(FixedMemorySampler::new(0.0)),
            Arc::new(NoopReclaimer),
        );
        assert!(
            matches!(
                result,
                Err(ConfigError::ZeroCheckInterval(_)
                    | ConfigError::PercentOutOfRange { .. }
                    | ConfigError::ThresholdOrder { .. })
            ),
            "{config:?} should be rejected"
        );
    }
}

#[tokio::test(start_paused = true)]
async fn background_monitor_sweeps_on_interval() {
    let sampler = Arc::new(FixedMemorySampler::new(10.0));
    let config = ManagerConfig::default().with_check_interval(Duration::from_secs(30));
    let manager =
        AdaptiveCacheManager::start(config, sampler.clone(), Arc::new(NoopReclaimer)).unwrap();
    let store = filled_store(8);
    manager.register_cache("store", store.clone()).unwrap();

    tokio::time::sleep(Duration::from_secs(31)).await;
    assert_eq!(sampler.samples_taken(), 1);
    assert_eq!(store.len(), 8);

    sampler.set_percent(72.0);
    tokio::time::sleep(Duration::from_secs(30)).await;
    assert_eq!(sampler.samples_taken(), 2);
    assert!(store.is_empty());
    assert_eq!(manager.last_tier(), Some(MemoryTier::High));

    manager.dispose();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(sampler.samples_taken(), 2);
}

/// Panics on its first sample, then reports high pressure.
#[derive(Default)]
struct FlakySampler {
    calls: AtomicUsize,
}

impl MemorySampler for FlakySampler {
    fn sample(&self) -> Result<MemoryUsage, SampleError> {
        if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("meminfo vanished");
        }
        Ok(MemoryUsage::from_percent(75.0))
    }
}

#[test]
fn panicking_sampler_skips_the_cycle() {
    let sampler = Arc::new(FlakySampler::default());
    let manager =
        AdaptiveCacheManager::new(ManagerConfig::default(), sampler, Arc::new(NoopReclaimer))
            .unwrap();
    let store = filled_store(4);
    manager.register_cache("store", store.clone()).unwrap();

    assert_eq!(manager.poll_once(), PollOutcome::SampleFailed);
    assert_eq!(store.len(), 4);
    assert_eq!(manager.poll_once().tier(), Some(MemoryTier::High));
    assert!(store.is_empty());
    assert_eq!(manager.stats().sample_failures(), 1);
}

#[tokio::test(start_paused = true)]
async fn monitor_survives_a_panicking_sampler() {
    let sampler = Arc::new(FlakySampler::default());
    let config = ManagerConfig::default().with_check_interval(Duration::from_secs(1));
    let manager =
        AdaptiveCacheManager::start(config, sampler.clone(), Arc::new(NoopReclaimer)).unwrap();
    let store = filled_store(4);
    manager.register_cache("store", store.clone()).unwrap();

    tokio::time::sleep(Duration::from_millis(5500)).await;
    assert_eq!(sampler.calls.load(Ordering::SeqCst), 5);
    assert_eq!(manager.stats().sample_failures(), 1);
    assert_eq!(manager.stats().high_polls(), 4);
    assert!(store.is_empty());
    assert!(!manager.is_disposed());
}

#[tokio::test(start_paused = true)]
async fn dropping_the_manager_stops_the_monitor() {
    let sampler = Arc::new(FixedMemorySampler::new(10.0));
    let config = ManagerConfig::default().with_check_interval(Duration::from_secs(1));
    let manager =
        AdaptiveCacheManager::start(config, sampler.clone(), Arc::new(NoopReclaimer)).unwrap();

    tokio::time::sleep(Duration::from_millis(1500)).await;
    assert_eq!(sampler.samples_taken(), 1);

    drop(manager);
    tokio::time::sleep(Duration::from_secs(10)).await;
    assert_eq!(sampler.samples_taken(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn registration_races_with_polling() {
    let sampler = Arc::new(FixedMemorySampler::new(90.0));
    let manager = Arc::new(
        AdaptiveCacheManager::new(
            ManagerConfig::default(),
            sampler.clone(),
            Arc::new(NoopReclaimer),
        )
        .unwrap(),
    );

    let registrars: Vec<_> = (0..8)
        .map(|t| {
            let manager = Arc::clone(&manager);
            tokio::spawn(async move {
                for i in 0..50 {
                    let name = format!("cache-{t}-{i}");
                    manager.register_cache(name, filled_store(2)).unwrap();
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();
    let poller = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            for _ in 0..100 {
                manager.poll_once();
                tokio::task::yield_now().await;
            }
        })
    };

    for registrar in registrars {
        registrar.await.unwrap();
    }
    poller.await.unwrap();

    assert_eq!(manager.registered_cache_count(), 400);
    let stats = manager.stats();
    assert_eq!(stats.critical_polls(), 100);
    assert_eq!(stats.polls(), 100);
    assert_eq!(stats.clear_failures(), 0);
}
