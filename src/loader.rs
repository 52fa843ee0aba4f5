//! Concurrent Resource Loader
//!
//! Produce-or-fetch over a [`ConcurrentLruCache`], for values that are
//! expensive to build (parsed syntax trees, type-checked modules, rendered
//! reports). The loader guarantees:
//!
//! - **At most one production per key at a time.** Concurrent requests for a
//!   key that is being produced join the running production and receive the
//!   same result.
//! - **A global cap on productions.** No more than `max_concurrent_loads`
//!   producer invocations run at once, across all keys.
//! - **No poisoning.** Failures are handed to every waiter of that production
//!   but never stored; the next request starts a fresh production.
//! - **Cancellation safety.** Productions run on their own Tokio task, so
//!   dropping or timing out a waiting request never aborts the work. Its result
//!   still lands in the store for the next caller.
//!
//! # How It Works
//!
//! ```text
//! get_or_load(key)
//!   │
//!   ├─ store hit ─────────────────────────────────────────▶ value
//!   │
//!   └─ miss ─▶ lock in-flight map
//!                ├─ episode running ─▶ join shared future ─▶ value / error
//!                └─ none ─▶ spawn episode, install shared future, join it
//!
//! episode task:
//!   acquire permit ─▶ re-check store ─┬─ hit ─────────────▶ value
//!                                     └─ miss ─▶ produce ─▶ store on success
//!   release permit ─▶ remove own in-flight marker
//! ```
//!
//! Requests must be polled inside a Tokio runtime, since each production is
//! spawned with [`tokio::spawn`].
//!
//! # Example
//!
//! ```
//! use adaptive_cache::config::{LoaderConfig, LruCacheConfig};
//! use adaptive_cache::loader::ResourceLoader;
//! use std::convert::Infallible;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let loader = ResourceLoader::new(
//!     LoaderConfig::new(LruCacheConfig::new(64)),
//!     |path: String| async move { Ok::<_, Infallible>(path.len()) },
//! )
//! .unwrap();
//!
//! assert_eq!(loader.get_or_load("src/main.rs".to_string()).await.unwrap(), 11);
//! assert_eq!(loader.cached("src/main.rs"), Some(11));
//! # }
//! ```

use crate::concurrent::ConcurrentLruCache;
use crate::config::LoaderConfig;
use crate::error::{panic_message, ConfigError, LoadError};
use crate::manager::ManagedCache;
use crate::metrics::{CacheMetrics, LoaderMetrics};
use async_trait::async_trait;
use core::fmt;
use core::hash::Hash;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::{BTreeMap, HashMap};
use std::error::Error as StdError;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Builds the value for a key.
///
/// Implementations may be slow and may fail; the loader takes care of
/// deduplication and concurrency limits. Any
/// `Fn(K) -> impl Future<Output = Result<V, E>>` closure is a producer.
#[async_trait]
pub trait Producer<K, V>: Send + Sync + 'static {
    /// Error returned when production fails.
    type Error: StdError + Send + Sync + 'static;

    /// Produces the value for `key`.
    async fn produce(&self, key: K) -> Result<V, Self::Error>;
}

#[async_trait]
impl<K, V, E, F, Fut> Producer<K, V> for F
where
    K: Send + 'static,
    V: Send + 'static,
    E: StdError + Send + Sync + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<V, E>> + Send + 'static,
{
    type Error = E;

    async fn produce(&self, key: K) -> Result<V, E> {
        (self)(key).await
    }
}

type Production<V> = BoxFuture<'static, Result<V, LoadError>>;

struct InFlight<V> {
    id: u64,
    result: Shared<Production<V>>,
}

struct LoaderInner<K, V, P> {
    store: Arc<ConcurrentLruCache<K, V>>,
    producer: P,
    inflight: Mutex<HashMap<K, InFlight<V>>>,
    permits: Semaphore,
    max_concurrent_loads: usize,
    next_episode: AtomicU64,
    metrics: LoaderMetrics,
}

/// Removes an episode's in-flight marker when the episode task ends, however
/// it ends.
struct EpisodeGuard<K, V, P>
where
    K: Hash + Eq,
{
    inner: Arc<LoaderInner<K, V, P>>,
    key: K,
    id: u64,
}

impl<K: Hash + Eq, V, P> LoaderInner<K, V, P> {
    /// Removes the in-flight marker for `key` if it still belongs to episode `id`.
    fn release(&self, key: &K, id: u64) {
        let mut inflight = self.inflight.lock();
        // A newer episode may own the slot if this one was already replaced.
        if inflight.get(key).is_some_and(|f| f.id == id) {
            inflight.remove(key);
        }
    }
}

impl<K: Hash + Eq, V, P> Drop for EpisodeGuard<K, V, P> {
    fn drop(&mut self) {
        self.inner.release(&self.key, self.id);
    }
}

/// Coalescing, concurrency-limited loader over a TTL-LRU store.
///
/// Cloning is cheap and yields a handle onto the same store, in-flight table
/// and permit pool.
pub struct ResourceLoader<K, V, P> {
    inner: Arc<LoaderInner<K, V, P>>,
}

impl<K, V, P> Clone for ResourceLoader<K, V, P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V, P> ResourceLoader<K, V, P>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    P: Producer<K, V>,
{
    /// Creates a loader with a fresh store built from `config.cache`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if `config` fails validation.
    pub fn new(config: LoaderConfig, producer: P) -> Result<Self, ConfigError> {
        config.validate()?;
        let store = Arc::new(ConcurrentLruCache::init(config.cache)?);
        Ok(Self::with_store(store, config.max_concurrent_loads, producer))
    }

    /// Creates a loader over an existing store.
    ///
    /// Useful to share one store between a loader and other readers, or to
    /// drive the store's TTL with a custom clock.
    pub fn with_store(
        store: Arc<ConcurrentLruCache<K, V>>,
        max_concurrent_loads: NonZeroUsize,
        producer: P,
    ) -> Self {
        let max = max_concurrent_loads.get();
        Self {
            inner: Arc::new(LoaderInner {
                store,
                producer,
                inflight: Mutex::new(HashMap::new()),
                permits: Semaphore::new(max),
                max_concurrent_loads: max,
                next_episode: AtomicU64::new(0),
                metrics: LoaderMetrics::default(),
            }),
        }
    }

    /// Returns the value for `key`, producing it with the loader's producer
    /// on a miss.
    ///
    /// # Errors
    ///
    /// - [`LoadError::Producer`] if the producer failed
    /// - [`LoadError::Aborted`] if the production task panicked or its runtime
    ///   shut down
    pub async fn get_or_load(&self, key: K) -> Result<V, LoadError> {
        let inner = Arc::clone(&self.inner);
        self.load(key, move |key| {
            async move {
                inner
                    .producer
                    .produce(key)
                    .await
                    .map_err(LoadError::producer)
            }
            .boxed()
        })
        .await
    }

    /// Returns the value for `key`, producing it with `produce` on a miss.
    ///
    /// `produce` only runs if this call starts a new production; a call that
    /// joins a running production or hits the store drops it unused.
    pub async fn get_or_load_with<F, Fut, E>(&self, key: K, produce: F) -> Result<V, LoadError>
    where
        F: FnOnce(K) -> Fut + Send + 'static,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
        E: StdError + Send + Sync + 'static,
    {
        self.load(key, move |key| {
            produce(key).map(|result| result.map_err(LoadError::producer)).boxed()
        })
        .await
    }

    async fn load<F>(&self, key: K, start: F) -> Result<V, LoadError>
    where
        F: FnOnce(K) -> Production<V> + Send + 'static,
    {
        if let Some(value) = self.inner.store.get(&key) {
            LoaderMetrics::bump(&self.inner.metrics.fast_hits);
            debug!(key = ?key, "loader hit");
            return Ok(value);
        }

        let result = {
            let mut inflight = self.inner.inflight.lock();
            match inflight.get(&key) {
                Some(running) => {
                    LoaderMetrics::bump(&self.inner.metrics.coalesced);
                    debug!(key = ?key, episode = running.id, "joining in-flight load");
                    running.result.clone()
                }
                None => {
                    let id = self.inner.next_episode.fetch_add(1, Ordering::Relaxed);
                    LoaderMetrics::bump(&self.inner.metrics.episodes);
                    debug!(key = ?key, episode = id, "starting load");
                    let result = self.spawn_episode(key.clone(), id, start);
                    inflight.insert(
                        key,
                        InFlight {
                            id,
                            result: result.clone(),
                        },
                    );
                    result
                }
            }
        };
        result.await
    }

    fn spawn_episode<F>(&self, key: K, id: u64, start: F) -> Shared<Production<V>>
    where
        F: FnOnce(K) -> Production<V> + Send + 'static,
    {
        let task = tokio::spawn(run_episode(Arc::clone(&self.inner), key.clone(), id, start));
        let inner = Arc::clone(&self.inner);
        async move {
            match task.await {
                Ok(result) => result,
                Err(join_error) => {
                    // The task may have been dropped before its guard existed.
                    inner.release(&key, id);
                    LoaderMetrics::bump(&inner.metrics.loads_aborted);
                    let reason = match join_error.try_into_panic() {
                        Ok(payload) => panic_message(payload.as_ref()),
                        Err(join_error) => join_error.to_string(),
                    };
                    error!(key = ?key, episode = id, reason = %reason, "load aborted");
                    Err(LoadError::Aborted(reason))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Drops every cached value. Productions already running still complete
    /// and store their results.
    pub fn clear_cache(&self) {
        let cleared = self.inner.store.clear();
        info!(cleared, "loader cache cleared");
    }

    /// Drops the cached value for `key`. Returns `true` if one was cached.
    pub fn invalidate<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.store.remove(key)
    }

    /// Returns the cached value for `key` without loading it.
    pub fn cached<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.store.get(key)
    }

    /// Number of keys with a production in flight.
    pub fn in_flight(&self) -> usize {
        self.inner.inflight.lock().len()
    }

    /// Permits not currently held by a production.
    pub fn available_permits(&self) -> usize {
        self.inner.permits.available_permits()
    }

    /// The configured cap on simultaneous productions.
    pub fn max_concurrent_loads(&self) -> usize {
        self.inner.max_concurrent_loads
    }

    /// The backing store.
    pub fn store(&self) -> &Arc<ConcurrentLruCache<K, V>> {
        &self.inner.store
    }

    /// The loader's own counters.
    pub fn stats(&self) -> &LoaderMetrics {
        &self.inner.metrics
    }
}

async fn run_episode<K, V, P, F>(
    inner: Arc<LoaderInner<K, V, P>>,
    key: K,
    id: u64,
    start: F,
) -> Result<V, LoadError>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    F: FnOnce(K) -> Production<V>,
{
    let _guard = EpisodeGuard {
        inner: Arc::clone(&inner),
        key: key.clone(),
        id,
    };
    let _permit = inner
        .permits
        .acquire()
        .await
        .map_err(|_| LoadError::Aborted("loader permits closed".to_string()))?;

    if let Some(value) = inner.store.get(&key) {
        LoaderMetrics::bump(&inner.metrics.late_hits);
        debug!(key = ?key, episode = id, "value stored while waiting for a permit");
        return Ok(value);
    }

    match start(key.clone()).await {
        Ok(value) => {
            LoaderMetrics::bump(&inner.metrics.loads_succeeded);
            inner.store.put(key.clone(), value.clone());
            debug!(key = ?key, episode = id, "load succeeded");
            Ok(value)
        }
        Err(err) => {
            LoaderMetrics::bump(&inner.metrics.loads_failed);
            warn!(key = ?key, episode = id, error = %err, "load failed");
            Err(err)
        }
    }
}

impl<K, V, P> ManagedCache for ResourceLoader<K, V, P>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    P: Producer<K, V>,
{
    fn clear(&self) {
        self.clear_cache();
    }

    fn len(&self) -> Option<usize> {
        Some(self.inner.store.len())
    }

    fn evict_fraction(&self, percent: f64) -> usize {
        self.inner.store.evict_fraction(percent)
    }
}

impl<K, V, P> CacheMetrics for ResourceLoader<K, V, P>
where
    K: Hash + Eq + Clone + fmt::Debug + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
    P: Producer<K, V>,
{
    fn metrics(&self) -> BTreeMap<String, f64> {
        let mut metrics = self.inner.store.metrics();
        metrics.extend(self.inner.metrics.metrics());
        metrics.insert("in_flight".to_string(), self.in_flight() as f64);
        metrics.insert(
            "available_permits".to_string(),
            self.available_permits() as f64,
        );
        metrics
    }

    fn algorithm_name(&self) -> &'static str {
        self.inner.metrics.algorithm_name()
    }
}

impl<K, V, P> fmt::Debug for ResourceLoader<K, V, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceLoader")
            .field("store", &self.inner.store)
            .field("in_flight", &self.inner.inflight.lock().len())
            .field("max_concurrent_loads", &self.inner.max_concurrent_loads)
            .finish()
    }
}
