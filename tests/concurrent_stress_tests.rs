//! Stress Tests for the Concurrent Store
//!
//! These tests verify thread safety and the capacity bound under high
//! contention.

use adaptive_cache::clock::ManualClock;
use adaptive_cache::config::LruCacheConfig;
use adaptive_cache::metrics::CacheMetrics;
use adaptive_cache::ConcurrentLruCache;
use scoped_threadpool::Pool;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

const NUM_THREADS: usize = 16;
const OPS_PER_THREAD: usize = 10_000;

/// Test high contention with many threads hammering the same keys
#[test]
fn stress_high_contention() {
    let cache: Arc<ConcurrentLruCache<usize, usize>> = Arc::new(ConcurrentLruCache::new(100));

    let mut handles = Vec::new();
    for t in 0..NUM_THREADS {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for i in 0..OPS_PER_THREAD {
                let key = i % 10; // Only 10 keys for high contention
                if t % 2 == 0 {
                    cache.put(key, t * OPS_PER_THREAD + i);
                } else {
                    let _ = cache.get(&key);
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("Thread panicked");
    }

    assert!(cache.len() <= 10);
}

/// Test that the capacity bound holds while threads overflow the cache
#[test]
fn stress_capacity_bound_under_overflow() {
    let cache: ConcurrentLruCache<usize, usize> = ConcurrentLruCache::new(64);
    let mut pool = Pool::new(8);

    pool.scoped(|scope| {
        for t in 0..8 {
            let cache = &cache;
            scope.execute(move || {
                for i in 0..2_000 {
                    cache.put(t * 10_000 + i, i);
                    assert!(cache.len() <= 64);
                }
            });
        }
    });

    assert_eq!(cache.len(), 64);
    let metrics = cache.metrics();
    assert_eq!(metrics["insertions"], 16_000.0);
    assert_eq!(metrics["evictions"], 16_000.0 - 64.0);
}

/// Mixed readers, writers, trimmers and clearers must never corrupt the list
#[test]
fn stress_mixed_operations() {
    let cache: ConcurrentLruCache<usize, String> = ConcurrentLruCache::new(256);
    let hits = AtomicUsize::new(0);
    let mut pool = Pool::new(8);

    pool.scoped(|scope| {
        for t in 0..8 {
            let cache = &cache;
            let hits = &hits;
            scope.execute(move || {
                for i in 0..5_000 {
                    let key = (t * 31 + i) % 512;
                    match i % 50 {
                        0 => {
                            cache.evict_fraction(25.0);
                        }
                        1 if t == 0 => {
                            cache.clear();
                        }
                        n if n % 3 == 0 => {
                            cache.remove(&key);
                        }
                        n if n % 2 == 0 => {
                            cache.put(key, format!("value-{key}"));
                        }
                        _ => {
                            if let Some(v) = cache.get(&key) {
                                assert_eq!(v, format!("value-{key}"));
                                hits.fetch_add(1, Ordering::Relaxed);
                            }
                        }
                    }
                }
            });
        }
    });

    assert!(cache.len() <= 256);
    assert_eq!(cache.keys_lru().len(), cache.len());
}

/// Expiration racing with lookups from many threads
#[test]
fn stress_expiration_with_concurrent_readers() {
    let clock = ManualClock::new();
    let config = LruCacheConfig::new(1_000).with_ttl(Duration::from_secs(10));
    let cache: ConcurrentLruCache<usize, usize> =
        ConcurrentLruCache::init_with_clock(config, Arc::new(clock.clone())).unwrap();
    for i in 0..1_000 {
        cache.put(i, i);
    }

    let mut pool = Pool::new(4);
    pool.scoped(|scope| {
        for t in 0..4 {
            let cache = &cache;
            let clock = &clock;
            scope.execute(move || {
                for i in 0..1_000 {
                    if t == 0 && i == 500 {
                        clock.advance(Duration::from_secs(10));
                    }
                    if t == 1 && i % 100 == 0 {
                        cache.purge_expired();
                    }
                    let _ = cache.get(&i);
                }
            });
        }
    });

    // Every entry expired once the clock moved; nothing may be returned.
    assert!((0..1_000).all(|i| cache.get(&i).is_none()));
    assert!(cache.is_empty());
}
