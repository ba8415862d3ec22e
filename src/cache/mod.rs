//! Cache Module
//!
//! Call keys, memoized entries and the interceptor that ties them together.

mod entry;
mod interceptor;
mod key;
mod stats;


// Re-export public types
pub use entry::CachedEntry;
pub use interceptor::CacheInterceptor;
pub use key::{ArgList, CallKey, MethodId, ReceiverId};
pub use stats::CacheStats;

pub(crate) use stats::StatsRecorder;
