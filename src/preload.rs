//! Preload
//!
//! Warms the cache with the head of a media file before playback asks for it.

use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::cache::RangeCache;
use crate::error::{RangeCacheError, Result};
use crate::fetch::{FetchedResponse, RangeFetcher};
use crate::range::{ContentRange, RangeRequest};

// == Preloader ==
/// Fetches `bytes=0-(n-1)` of a resource and stores it.
#[derive(Debug, Clone)]
pub struct Preloader {
    fetcher: RangeFetcher,
}

impl Preloader {
    pub fn new(fetcher: RangeFetcher) -> Self {
        Self { fetcher }
    }

    // == Preload ==
    /// Caches the first `byte_count` bytes of `url`.
    ///
    /// Never fails: network and parsing errors are logged and dropped. The
    /// lock is only taken after the fetch completes, so dropping this future
    /// cancels the fetch and stores nothing.
    pub async fn preload(&self, cache: &RwLock<RangeCache>, url: &str, byte_count: u64) {
        if byte_count == 0 {
            return;
        }

        match self.fetch_head(url, byte_count).await {
            Ok(fetched) => {
                let stored = match stored_range(&fetched, byte_count) {
                    Ok(range) => range,
                    Err(err) => {
                        warn!(url, %err, "preload response unusable");
                        return;
                    }
                };
                let mut cache = cache.write().await;
                cache.store_range(
                    url,
                    fetched.body,
                    stored.start,
                    stored.end,
                    stored.total.unwrap_or(byte_count),
                    fetched.etag,
                );
                debug!(url, start = stored.start, end = stored.end, "preloaded range");
            }
            Err(err) => warn!(url, %err, "preload failed"),
        }
    }

    async fn fetch_head(&self, url: &str, byte_count: u64) -> Result<FetchedResponse> {
        let range = RangeRequest::new(0, Some(byte_count - 1)).to_header_value();
        self.fetcher.fetch_success(url, Some(&range)).await
    }
}

/// Works out which bytes a preload response holds.
///
/// Uses `Content-Range` when the origin sent one. Otherwise the body is taken
/// to start at zero, and the resource is assumed to be at least as long as
/// both the request and the body.
fn stored_range(fetched: &FetchedResponse, byte_count: u64) -> Result<ContentRange> {
    if fetched.body.is_empty() {
        return Err(RangeCacheError::Upstream("empty preload body".to_string()));
    }

    if let Some(header) = fetched.content_range.as_deref() {
        return ContentRange::parse(header);
    }

    let body_len = fetched.body.len() as u64;
    Ok(ContentRange::new(0, body_len - 1, Some(byte_count.max(body_len))))
}
