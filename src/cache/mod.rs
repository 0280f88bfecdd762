//! Cache Module
//!
//! Provides the in-memory byte-range cache with lazy expiry, range coalescing
//! and size-bounded eviction.

mod clock;
mod coalesce;
mod entry;
mod key;
mod stats;
mod store;


// Re-export public types
pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "test-util"))]
pub use clock::ManualClock;
pub use coalesce::coalesce;
pub use entry::CacheEntry;
pub use key::{CacheKey, CACHE_BUSTING_PARAMS};
pub use stats::CacheStats;
pub use store::{RangeCache, RangeHit};
