//! Caching Interceptor Module
//!
//! Decides, per call, whether to serve a memoized result or run the real
//! computation. The store is a lock-striped concurrent map; no shard lock is
//! held while a computation runs, and entries are replaced whole.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tracing::{debug, info, trace};

use crate::cache::{CacheStats, CachedEntry, CallKey, StatsRecorder};

// == Cache Interceptor ==
/// Shared memoization engine.
///
/// One interceptor may serve any number of decorated instances and methods;
/// share it with `Arc<CacheInterceptor>`.
#[derive(Debug, Default)]
pub struct CacheInterceptor {
    /// Call key -> latest successful result
    entries: DashMap<CallKey, Arc<CachedEntry>>,
    /// Activity counters
    stats: StatsRecorder,
}

impl CacheInterceptor {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Resolve ==
    /// Returns the memoized result for `key`, or runs `compute` and memoizes it.
    ///
    /// A stored value is served only while it is younger than `ttl`; a zero
    /// `ttl` never hits. When `compute` fails its error is returned as is and
    /// the store is left untouched. Concurrent misses on the same key may all
    /// compute; whichever stores last is what later readers see.
    pub fn resolve<T, E, F>(&self, key: CallKey, ttl: Duration, compute: F) -> Result<T, E>
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> Result<T, E>,
    {
        if let Some(value) = self.lookup::<T>(&key, ttl) {
            self.stats.record_hit();
            trace!(method = %key.method(), args = ?key.args(), "cache hit");
            return Ok(value);
        }

        self.stats.record_miss();
        trace!(method = %key.method(), args = ?key.args(), "cache miss");

        match compute() {
            Ok(value) => {
                self.store(key, value.clone());
                Ok(value)
            }
            Err(err) => {
                self.stats.record_failure();
                debug!(method = %key.method(), "computation failed, nothing cached");
                Err(err)
            }
        }
    }

    /// Infallible form of [`resolve`](Self::resolve).
    pub fn resolve_value<T, F>(&self, key: CallKey, ttl: Duration, compute: F) -> T
    where
        T: Clone + Send + Sync + 'static,
        F: FnOnce() -> T,
    {
        match self.resolve(key, ttl, || Ok::<T, Infallible>(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    // == Lookup ==
    /// Clones the entry out of its shard before inspecting it.
    fn lookup<T: Clone + 'static>(&self, key: &CallKey, ttl: Duration) -> Option<T> {
        let entry = self.entries.get(key).map(|e| Arc::clone(e.value()))?;

        if !entry.is_fresh(ttl) {
            return None;
        }
        entry.value::<T>().cloned()
    }

    // == Store ==
    fn store<T: Send + Sync + 'static>(&self, key: CallKey, value: T) {
        let method = key.method();
        self.entries.insert(key, Arc::new(CachedEntry::new(value)));
        self.stats.record_store();
        debug!(method = %method, "cached result stored");
    }

    // == Purge ==
    /// Removes entries computed more than `max_age` ago.
    ///
    /// Never invoked implicitly: without it, stale entries stay in the store
    /// until their key is computed again. Returns the number removed.
    pub fn purge_older_than(&self, max_age: Duration) -> usize {
        let mut removed = 0;
        self.entries.retain(|_, entry| {
            let keep = entry.age() <= max_age;
            if !keep {
                removed += 1;
            }
            keep
        });

        info!(removed, ?max_age, "purged stale cache entries");
        removed
    }

    // == Clear ==
    /// Drops every entry and resets the counters.
    pub fn clear(&self) {
        self.entries.clear();
        self.stats.reset();
    }

    // == Stats ==
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len())
    }

    // == Length ==
    /// Number of stored entries, stale ones included.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
