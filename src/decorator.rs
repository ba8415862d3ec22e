//! Decorator Module
//!
//! Routes calls on a wrapped service through the shared interceptor.
//!
//! A service trait is implemented for `Decorated<S>` by forwarding each
//! method to [`Decorated::intercept`] (fallible) or
//! [`Decorated::intercept_value`] (infallible). Marked methods are memoized;
//! everything else goes straight to the wrapped instance.
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Duration;
//! use memo_cache::{method_id, CacheInterceptor, Decorated, Decorator, TtlTable};
//!
//! trait Lookup {
//!     fn lookup(&self, id: u32) -> String;
//! }
//!
//! struct Db;
//!
//! impl Lookup for Db {
//!     fn lookup(&self, id: u32) -> String {
//!         format!("row-{id}")
//!     }
//! }
//!
//! impl<S: Lookup> Lookup for Decorated<S> {
//!     fn lookup(&self, id: u32) -> String {
//!         self.intercept_value(method_id!(Lookup::lookup), id, |db| db.lookup(id))
//!     }
//! }
//!
//! let ttls = TtlTable::new().with_ttl(method_id!(Lookup::lookup), Duration::from_secs(5));
//! let db = Decorator::new(Arc::new(CacheInterceptor::new()), ttls)
//!     .mark(method_id!(Lookup::lookup))
//!     .decorate(Db)
//!     .unwrap();
//!
//! assert_eq!(db.lookup(7), "row-7");
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cache::{ArgList, CacheInterceptor, CallKey, MethodId, ReceiverId};
use crate::config::TtlTable;
use crate::error::{ConfigError, Result};

// == Decorator ==
/// Builder that wraps service instances for memoized calls.
#[derive(Debug, Clone)]
pub struct Decorator {
    interceptor: Arc<CacheInterceptor>,
    marked: HashSet<MethodId>,
    ttls: TtlTable,
}

impl Decorator {
    pub fn new(interceptor: Arc<CacheInterceptor>, ttls: TtlTable) -> Self {
        Self {
            interceptor,
            marked: HashSet::new(),
            ttls,
        }
    }

    /// Marks `method` as cacheable.
    pub fn mark(mut self, method: MethodId) -> Self {
        self.marked.insert(method);
        self
    }

    /// Marks every method in `methods` as cacheable.
    pub fn mark_all<I: IntoIterator<Item = MethodId>>(mut self, methods: I) -> Self {
        self.marked.extend(methods);
        self
    }

    // == Decorate ==
    /// Wraps `inner`, giving it its own receiver identity.
    ///
    /// Every marked method must have a TTL in the table; otherwise this fails
    /// with [`ConfigError::MissingTtl`] before any call can be made.
    pub fn decorate<S>(&self, inner: S) -> Result<Decorated<S>> {
        let mut ttls = HashMap::with_capacity(self.marked.len());
        for method in &self.marked {
            let ttl = self
                .ttls
                .ttl_for(method)
                .ok_or_else(|| ConfigError::MissingTtl {
                    method: method.qualified_name(),
                })?;
            ttls.insert(*method, ttl);
        }

        let receiver = ReceiverId::fresh();
        info!(
            receiver = ?receiver,
            cacheable = ttls.len(),
            "decorated service instance"
        );

        Ok(Decorated {
            inner,
            receiver,
            ttls,
            interceptor: Arc::clone(&self.interceptor),
        })
    }

    pub fn interceptor(&self) -> &Arc<CacheInterceptor> {
        &self.interceptor
    }
}

// == Decorated ==
/// A service instance whose marked methods are memoized.
#[derive(Debug)]
pub struct Decorated<S> {
    inner: S,
    receiver: ReceiverId,
    ttls: HashMap<MethodId, Duration>,
    interceptor: Arc<CacheInterceptor>,
}

impl<S> Decorated<S> {
    // == Intercept ==
    /// Runs `call` against the wrapped instance, memoizing it if `method` is
    /// marked. Errors from `call` come back unchanged and are never cached.
    ///
    /// `args` must capture everything `call` depends on besides the receiver.
    pub fn intercept<A, T, E, F>(
        &self,
        method: MethodId,
        args: A,
        call: F,
    ) -> std::result::Result<T, E>
    where
        A: ArgList,
        T: Clone + Send + Sync + 'static,
        F: FnOnce(&S) -> std::result::Result<T, E>,
    {
        match self.ttls.get(&method) {
            Some(&ttl) => {
                let key = CallKey::new(method, self.receiver, args);
                self.interceptor.resolve(key, ttl, || call(&self.inner))
            }
            None => {
                debug!(method = %method, "not cacheable, calling through");
                call(&self.inner)
            }
        }
    }

    /// Infallible form of [`intercept`](Self::intercept).
    pub fn intercept_value<A, T, F>(&self, method: MethodId, args: A, call: F) -> T
    where
        A: ArgList,
        T: Clone + Send + Sync + 'static,
        F: FnOnce(&S) -> T,
    {
        match self.ttls.get(&method) {
            Some(&ttl) => {
                let key = CallKey::new(method, self.receiver, args);
                self.interceptor.resolve_value(key, ttl, || call(&self.inner))
            }
            None => {
                debug!(method = %method, "not cacheable, calling through");
                call(&self.inner)
            }
        }
    }

    // == Accessors ==
    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn into_inner(self) -> S {
        self.inner
    }

    pub fn receiver(&self) -> ReceiverId {
        self.receiver
    }

    pub fn is_cacheable(&self, method: &MethodId) -> bool {
        self.ttls.contains_key(method)
    }

    /// TTL resolved for `method` at decoration time.
    pub fn ttl_for(&self, method: &MethodId) -> Option<Duration> {
        self.ttls.get(method).copied()
    }

    pub fn interceptor(&self) -> &Arc<CacheInterceptor> {
        &self.interceptor
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const QUERY: MethodId = MethodId::new("Counter", "query");
    const PLAIN: MethodId = MethodId::new("Counter", "plain");

    #[derive(Default)]
    struct Counter {
        calls: AtomicUsize,
    }

    impl Counter {
        fn bump(&self) -> usize {
            self.calls.fetch_add(1, Ordering::SeqCst) + 1
        }
    }

    fn decorator() -> Decorator {
        let ttls = TtlTable::new().with_ttl(QUERY, Duration::from_secs(60));
        Decorator::new(Arc::new(CacheInterceptor::new()), ttls).mark(QUERY)
    }

    #[test]
    fn test_decorate_missing_ttl_is_config_error() {
        let result = decorator().mark(PLAIN).decorate(Counter::default());

        match result {
            Err(ConfigError::MissingTtl { method }) => assert_eq!(method, "Counter::plain"),
            other => panic!("expected MissingTtl, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_marked_method_is_memoized() {
        let counter = decorator().decorate(Counter::default()).unwrap();

        assert_eq!(counter.intercept_value(QUERY, 1u32, Counter::bump), 1);
        assert_eq!(counter.intercept_value(QUERY, 1u32, Counter::bump), 1);
        assert_eq!(counter.inner().calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unmarked_method_bypasses_store() {
        let counter = decorator().decorate(Counter::default()).unwrap();

        assert_eq!(counter.intercept_value(PLAIN, 1u32, Counter::bump), 1);
        assert_eq!(counter.intercept_value(PLAIN, 1u32, Counter::bump), 2);
        assert!(counter.interceptor().is_empty());
        assert!(!counter.is_cacheable(&PLAIN));
    }

    #[test]
    fn test_instances_do_not_share_results() {
        let decorator = decorator();
        let first = decorator.decorate(Counter::default()).unwrap();
        let second = decorator.decorate(Counter::default()).unwrap();

        assert_ne!(first.receiver(), second.receiver());
        first.intercept_value(QUERY, 1u32, Counter::bump);
        second.intercept_value(QUERY, 1u32, Counter::bump);

        assert_eq!(second.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(decorator.interceptor().len(), 2);
    }

    #[test]
    fn test_intercept_propagates_error_unchanged() {
        let counter = decorator().decorate(Counter::default()).unwrap();

        let result: std::result::Result<usize, String> =
            counter.intercept(QUERY, 1u32, |_| Err("boom".to_string()));

        assert_eq!(result, Err("boom".to_string()));
        assert!(counter.interceptor().is_empty());
    }

    #[test]
    fn test_ttl_resolved_at_decoration() {
        let counter = decorator().decorate(Counter::default()).unwrap();

        assert_eq!(counter.ttl_for(&QUERY), Some(Duration::from_secs(60)));
        assert_eq!(counter.ttl_for(&PLAIN), None);
        assert_eq!(counter.into_inner().calls.load(Ordering::SeqCst), 0);
    }
}
