//! Loads "compiled artifacts" through a coalescing loader while an adaptive
//! manager watches a simulated memory gauge.
//!
//! ```sh
//! RUST_LOG=adaptive_cache=debug cargo run --example artifact_loading
//! ```

use adaptive_cache::config::{LoaderConfig, LruCacheConfig, ManagerConfig};
use adaptive_cache::memory::FixedMemorySampler;
use adaptive_cache::metrics::CacheMetrics;
use adaptive_cache::{AdaptiveCacheManager, ResourceLoader};
use futures_util::future::join_all;
use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
#[error("no such module: {0}")]
struct MissingModule(String);

#[derive(Debug)]
struct Artifact {
    module: String,
    bytes: usize,
}

async fn compile(module: String) -> Result<Arc<Artifact>, MissingModule> {
    if module.starts_with("missing") {
        return Err(MissingModule(module));
    }
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(Arc::new(Artifact {
        bytes: module.len() * 1024,
        module,
    }))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let compiles = Arc::new(AtomicUsize::new(0));
    let loader = {
        let compiles = Arc::clone(&compiles);
        ResourceLoader::new(
            LoaderConfig::new(LruCacheConfig::new(64).with_ttl(Duration::from_secs(30 * 60)))
                .with_max_concurrent_loads(NonZeroUsize::new(2).ok_or("zero loads")?),
            move |module: String| {
                compiles.fetch_add(1, Ordering::Relaxed);
                compile(module)
            },
        )?
    };

    let gauge = Arc::new(FixedMemorySampler::new(40.0));
    let manager = AdaptiveCacheManager::start(
        ManagerConfig::default().with_check_interval(Duration::from_millis(200)),
        gauge.clone(),
        Arc::new(|| tracing::info!("heap reclaim requested")),
    )?;
    manager.register_cache("artifacts", Arc::new(loader.clone()))?;

    // Twenty requests for five modules: one compile per module.
    let modules = ["core", "parser", "typeck", "codegen", "driver"];
    let requests = (0..20).map(|i| loader.get_or_load(modules[i % modules.len()].to_string()));
    for artifact in join_all(requests).await.into_iter().flatten().take(5) {
        println!("{:<8} {:>6} bytes", artifact.module, artifact.bytes);
    }
    println!("compiles so far: {}", compiles.load(Ordering::Relaxed));

    if let Err(err) = loader.get_or_load("missing-crate".to_string()).await {
        println!("expected failure: {err}");
    }

    println!("simulating memory pressure");
    gauge.set_percent(90.0);
    tokio::time::sleep(Duration::from_millis(450)).await;
    println!(
        "cached after sweep: {}, last tier: {:?}",
        loader.store().len(),
        manager.last_tier()
    );

    gauge.set_percent(30.0);
    loader.get_or_load("core".to_string()).await?;
    println!("compiles after reload: {}", compiles.load(Ordering::Relaxed));

    println!("loader metrics: {:?}", loader.metrics());
    println!("manager metrics: {:?}", manager.metrics());
    manager.dispose();
    Ok(())
}
