//! Cache Entry Module
//!
//! A computed result paired with the instant it was computed. Entries are
//! immutable once built and are published to the store behind an `Arc`, so a
//! reader always sees a value together with its own timestamp.

use std::any::Any;
use std::sync::Arc;
use std::time::{Duration, Instant};

// == Cached Entry ==
/// A single memoized result.
#[derive(Debug)]
pub struct CachedEntry {
    /// The computed value, type-erased
    value: Arc<dyn Any + Send + Sync>,
    /// Monotonic timestamp of the computation
    computed_at: Instant,
}

impl CachedEntry {
    // == Constructor ==
    /// Wraps a freshly computed value, stamped with the current instant.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::computed_at(value, Instant::now())
    }

    /// Wraps a value with an explicit computation instant.
    pub fn computed_at<T: Any + Send + Sync>(value: T, computed_at: Instant) -> Self {
        Self {
            value: Arc::new(value),
            computed_at,
        }
    }

    // == Freshness ==
    /// Checks whether the entry may be served under `ttl` at instant `now`.
    ///
    /// Valid iff `ttl` is non-zero and `now - computed_at <= ttl`. The elapsed
    /// time saturates at zero if `now` precedes the computation.
    pub fn is_fresh_at(&self, ttl: Duration, now: Instant) -> bool {
        !ttl.is_zero() && now.saturating_duration_since(self.computed_at) <= ttl
    }

    /// Checks freshness against the current instant.
    pub fn is_fresh(&self, ttl: Duration) -> bool {
        self.is_fresh_at(ttl, Instant::now())
    }

    // == Accessors ==
    /// Returns the value if it has type `T`.
    pub fn value<T: Any>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    pub fn computed_at_instant(&self) -> Instant {
        self.computed_at
    }

    /// Time elapsed since the value was computed.
    pub fn age(&self) -> Duration {
        self.computed_at.elapsed()
    }
}
