//! Range Cache - An in-memory byte-range cache for progressive media playback
//!
//! Serves overlapping and partial `Range` requests from memory, coalesces
//! adjacent ranges, and evicts under a byte budget. The [`intercept`] filters
//! plug it into any request pipeline; the [`api`] module hosts them in a local
//! caching proxy.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod intercept;
pub mod models;
pub mod preload;
pub mod range;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, RangeCache, RangeHit};
pub use config::{CacheConfig, Config};
pub use error::RangeCacheError;
pub use intercept::{filter_request, filter_response, FilterOutcome, MediaRequest, MediaResponse};
pub use preload::Preloader;
pub use tasks::spawn_purge_task;
