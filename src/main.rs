//! Memo Cache demo
//!
//! Decorates a data service, then issues calls with pauses in between to show
//! a computed call, a cache hit, an expiry, and an uncached method.

use std::env;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::sleep;
use std::time::Duration;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use memo_cache::{method_id, CacheInterceptor, Decorated, Decorator, TtlTable};

// == Demo Service ==
trait DataService {
    /// Expensive query, marked cacheable.
    fn query_data(&self, id: u32) -> Vec<String>;

    /// Same query, never cached.
    fn query_data_without_cache(&self, id: u32) -> Vec<String>;
}

/// Returns rows that change on every real query.
#[derive(Debug, Default)]
struct GeneratedDataService {
    generation: AtomicU64,
}

impl GeneratedDataService {
    fn rows(&self, id: u32) -> Vec<String> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst);
        info!(id, generation, "running real query");
        (0..3).map(|i| format!("row-{}-{}-{}", id, generation, i)).collect()
    }
}

impl DataService for GeneratedDataService {
    fn query_data(&self, id: u32) -> Vec<String> {
        self.rows(id)
    }

    fn query_data_without_cache(&self, id: u32) -> Vec<String> {
        self.rows(id)
    }
}

impl<S: DataService> DataService for Decorated<S> {
    fn query_data(&self, id: u32) -> Vec<String> {
        self.intercept_value(method_id!(DataService::query_data), id, |svc| {
            svc.query_data(id)
        })
    }

    fn query_data_without_cache(&self, id: u32) -> Vec<String> {
        self.intercept_value(
            method_id!(DataService::query_data_without_cache),
            id,
            |svc| svc.query_data_without_cache(id),
        )
    }
}

// == Demo Config ==
/// Demo settings loaded from the environment.
#[derive(Debug, Clone)]
struct DemoConfig {
    /// Default TTL for `DataService::query_data` when the TTL table omits it
    query_ttl_secs: u64,
}

impl DemoConfig {
    /// # Environment Variables
    /// - `DEMO_QUERY_TTL_SECS` - TTL of the cached query (default: 2)
    fn from_env() -> Self {
        Self {
            query_ttl_secs: env::var("DEMO_QUERY_TTL_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(2),
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "memo_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = DemoConfig::from_env();
    let defaults = TtlTable::new().with_ttl(
        method_id!(DataService::query_data),
        Duration::from_secs(config.query_ttl_secs),
    );
    let ttls = defaults.merge(TtlTable::from_env()?);
    info!(?config, entries = ttls.len(), "TTL table loaded");

    let interceptor = Arc::new(CacheInterceptor::new());
    let service = Decorator::new(Arc::clone(&interceptor), ttls)
        .mark_all([method_id!(DataService::query_data)])
        .decorate(GeneratedDataService::default())?;

    // Cached: only the first call runs the real query, the second is a hit
    println!("{:?}", service.query_data(1));
    sleep(Duration::from_secs(1));
    println!("{:?}", service.query_data(1));
    sleep(Duration::from_secs(3));
    println!("{:?}", service.query_data(1));

    // Uncached: both calls run the real query
    println!("{:?}", service.query_data_without_cache(1));
    sleep(Duration::from_secs(1));
    println!("{:?}", service.query_data_without_cache(1));

    let stats = interceptor.stats();
    info!(
        hits = stats.hits,
        misses = stats.misses,
        hit_rate = stats.hit_rate(),
        "demo finished"
    );
    println!("{}", serde_json::to_string_pretty(&stats)?);

    Ok(())
}
