//! Cache Key Module
//!
//! Normalizes request URLs so that requests differing only in cache-busting
//! query noise share one key.

use std::fmt;

use url::Url;

/// Query parameters that never participate in key identity.
pub const CACHE_BUSTING_PARAMS: &[&str] = &["_", "timestamp", "t"];

// == Cache Key ==
/// Normalized resource identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    // == Normalize ==
    /// Derives a key from a request URL.
    ///
    /// Strips the [`CACHE_BUSTING_PARAMS`] and reserializes. Never fails: a URL
    /// that does not parse is used verbatim, which only makes the key stricter.
    pub fn normalize(raw: &str) -> Self {
        let mut url = match Url::parse(raw) {
            Ok(url) => url,
            Err(_) => return Self(raw.to_string()),
        };

        if url.query().is_none() {
            return Self(url.into());
        }

        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(name, _)| !CACHE_BUSTING_PARAMS.contains(&name.as_ref()))
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();

        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }

        Self(url.into())
    }

    /// Returns the key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CacheKey {
    fn from(raw: &str) -> Self {
        Self::normalize(raw)
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_cache_busting_params() {
        let key = CacheKey::normalize("https://cdn.example.com/v/movie.mp4?t=123&_=99&timestamp=5");
        assert_eq!(key.as_str(), "https://cdn.example.com/v/movie.mp4");
    }

    #[test]
    fn test_keeps_other_params() {
        let key = CacheKey::normalize("https://cdn.example.com/movie.mp4?token=abc&t=1&quality=hd");
        assert_eq!(
            key.as_str(),
            "https://cdn.example.com/movie.mp4?token=abc&quality=hd"
        );
    }

    #[test]
    fn test_busting_params_collide() {
        let a = CacheKey::normalize("https://cdn.example.com/movie.mp4?sig=1&t=100");
        let b = CacheKey::normalize("https://cdn.example.com/movie.mp4?sig=1&t=200");
        assert_eq!(a, b);
    }

    #[test]
    fn test_other_params_distinguish() {
        let a = CacheKey::normalize("https://cdn.example.com/movie.mp4?sig=1");
        let b = CacheKey::normalize("https://cdn.example.com/movie.mp4?sig=2");
        assert_ne!(a, b);
    }

    #[test]
    fn test_unparseable_falls_back_to_raw() {
        let key = CacheKey::normalize("not a url?t=1");
        assert_eq!(key.as_str(), "not a url?t=1");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = CacheKey::normalize("https://cdn.example.com/a%20b.mp4?x=a+b&t=9");
        let twice = CacheKey::normalize(once.as_str());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_space_in_value_matches_with_busting_params() {
        let plain = CacheKey::normalize("https://cdn.example.com/0.mp4?a=x+y");
        let busted = CacheKey::normalize("https://cdn.example.com/0.mp4?a=x%20y&t=1&_=1");
        assert_eq!(plain, busted);
        assert_eq!(plain.as_str(), "https://cdn.example.com/0.mp4?a=x+y");

        let lone_space = CacheKey::normalize("https://cdn.example.com/0.mp4?a=+");
        let lone_space_busted = CacheKey::normalize("https://cdn.example.com/0.mp4?a=+&t=7");
        assert_eq!(lone_space, lone_space_busted);
    }

    #[test]
    fn test_no_query_is_unchanged() {
        let key = CacheKey::normalize("https://cdn.example.com/movie.mp4");
        assert_eq!(key.to_string(), "https://cdn.example.com/movie.mp4");
    }
}
