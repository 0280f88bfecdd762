//! Expiry Purge Task
//!
//! Lazy expiry already hides stale ranges from lookups; this task returns
//! their memory without waiting for the next lookup on the same key.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::cache::RangeCache;

/// Spawns a background task that periodically purges expired ranges.
///
/// # Arguments
/// * `cache` - Shared reference to the cache
/// * `interval_secs` - Interval in seconds between purge runs
///
/// # Returns
/// A JoinHandle for the spawned task, to be aborted during shutdown.
///
/// # Example
/// ```ignore
/// let cache = Arc::new(RwLock::new(RangeCache::new(CacheConfig::default())));
/// let purge_handle = spawn_purge_task(cache.clone(), 60);
/// // Later, during shutdown:
/// purge_handle.abort();
/// ```
pub fn spawn_purge_task(cache: Arc<RwLock<RangeCache>>, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting expiry purge task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let (removed, total_bytes) = {
                let mut cache_guard = cache.write().await;
                let removed = cache_guard.purge_expired();
                (removed, cache_guard.total_bytes())
            };

            if removed > 0 {
                info!(removed, total_bytes, "Expiry purge: removed expired ranges");
            } else {
                debug!("Expiry purge: no expired ranges found");
            }
        }
    })
}
