//! Upstream Fetching
//!
//! Issues ranged GET requests against the origin. Responses come back with
//! their headers read and the body still on the wire, so callers decide
//! whether to buffer it or stream it through.

use std::time::Duration;

use axum::body::Body;
use bytes::Bytes;
use reqwest::header::{HeaderName, CONTENT_RANGE, CONTENT_TYPE, ETAG, RANGE};
use reqwest::{Client, Response};
use tracing::debug;

use crate::error::{RangeCacheError, Result};

// == Fetched Response ==
/// A fully buffered origin response.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub content_range: Option<String>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    pub body: Bytes,
}

impl FetchedResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// == Upstream Response ==
/// An origin response whose body has not been read yet.
#[derive(Debug)]
pub struct UpstreamResponse {
    pub status: u16,
    pub content_range: Option<String>,
    pub content_type: Option<String>,
    pub etag: Option<String>,
    /// Body size announced by the origin, if any
    pub content_length: Option<u64>,
    response: Response,
}

impl UpstreamResponse {
    fn new(response: Response) -> Self {
        let header = |name: HeaderName| {
            response
                .headers()
                .get(name)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        Self {
            status: response.status().as_u16(),
            content_range: header(CONTENT_RANGE),
            content_type: header(CONTENT_TYPE),
            etag: header(ETAG),
            content_length: response.content_length(),
            response,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Reads the whole body into memory.
    pub async fn buffer(self) -> Result<FetchedResponse> {
        let body = self.response.bytes().await?;
        Ok(FetchedResponse {
            status: self.status,
            content_range: self.content_range,
            content_type: self.content_type,
            etag: self.etag,
            body,
        })
    }

    /// Hands the body over as a stream, without buffering it.
    pub fn into_body(self) -> Body {
        Body::from_stream(self.response.bytes_stream())
    }
}

// == Range Fetcher ==
/// Thin wrapper over a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct RangeFetcher {
    client: Client,
}

impl RangeFetcher {
    /// Creates a fetcher whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }

    /// Uses an existing client, for callers that configure their own pool.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    // == Send ==
    /// GETs `url`, forwarding `range` verbatim as the `Range` header.
    ///
    /// Returns once the response headers arrive. Any HTTP status is returned
    /// as-is; only transport failures are errors.
    pub async fn send(&self, url: &str, range: Option<&str>) -> Result<UpstreamResponse> {
        let mut request = self.client.get(url);
        if let Some(range) = range {
            request = request.header(RANGE, range);
        }

        let response = UpstreamResponse::new(request.send().await?);
        debug!(
            url,
            status = response.status,
            ?range,
            content_length = ?response.content_length,
            "upstream responded"
        );
        Ok(response)
    }

    // == Fetch ==
    /// Same as [`RangeFetcher::send`] but buffers the body.
    pub async fn fetch(&self, url: &str, range: Option<&str>) -> Result<FetchedResponse> {
        self.send(url, range).await?.buffer().await
    }

    /// Same as [`RangeFetcher::fetch`] but non-2xx statuses become errors.
    pub async fn fetch_success(&self, url: &str, range: Option<&str>) -> Result<FetchedResponse> {
        let fetched = self.fetch(url, range).await?;
        if !fetched.is_success() {
            return Err(RangeCacheError::Upstream(format!(
                "{url} answered with status {}",
                fetched.status
            )));
        }
        Ok(fetched)
    }
}
