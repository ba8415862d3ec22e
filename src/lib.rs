//! Memo Cache - transparent, time-bounded memoization for service methods
//!
//! Calls to methods marked cacheable are keyed by method, receiver and
//! arguments, and served from a shared concurrent store while younger than the
//! method's TTL.

pub mod cache;
pub mod config;
pub mod decorator;
pub mod error;

pub use cache::{CacheInterceptor, CacheStats, CallKey, MethodId, ReceiverId};
pub use config::TtlTable;
pub use decorator::{Decorated, Decorator};
pub use error::ConfigError;
