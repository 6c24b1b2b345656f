//! Rate Limit Tracking
//!
//! Tracks the most recently observed Nitrapi quota headers.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::warn;

/// Header probed to decide whether the response carries quota information.
///
/// The name is cased differently from the value headers below. This matches
/// the upstream API client literally: a server that never sends `X-Rate-Limit`
/// never populates the snapshot, even when the `X-RateLimit-*` values are
/// present.
const PROBE_HEADER: &str = "X-Rate-Limit";

const LIMIT_HEADER: &str = "X-RateLimit-Limit";
const REMAINING_HEADER: &str = "X-RateLimit-Remaining";
const RESET_HEADER: &str = "X-RateLimit-Reset";

/// Last observed rate limit values for the API
///
/// Overwritten wholesale after each successful structured call that carries
/// quota headers; never merged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    /// Requests allowed in the current window
    pub limit: i32,

    /// Requests remaining in the current window
    pub remaining: i32,

    /// When the window resets, as epoch seconds
    pub reset: i64,
}

impl RateLimit {
    /// The reset instant as a UTC timestamp, when the epoch value is valid.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        DateTime::<Utc>::from_timestamp(self.reset, 0)
    }
}

/// Tracks the rate limit snapshot across requests
#[derive(Debug, Default)]
pub struct RateLimitTracker {
    snapshot: RwLock<RateLimit>,
}

impl RateLimitTracker {
    /// Create a new tracker with a zeroed snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of the current snapshot
    pub fn snapshot(&self) -> RateLimit {
        *self.snapshot.read()
    }

    /// Update the snapshot from response headers.
    ///
    /// Does nothing unless the probe header is present. Each value header
    /// that is missing or unparseable leaves its field untouched and logs a
    /// warning.
    pub fn update_from_headers(&self, headers: &HeaderMap) {
        if headers.get(PROBE_HEADER).is_none() {
            return;
        }

        let mut snapshot = self.snapshot.write();

        match parse_header::<i32>(headers, LIMIT_HEADER) {
            Some(limit) => snapshot.limit = limit,
            None => warn!(header = LIMIT_HEADER, "unreadable rate limit header"),
        }
        match parse_header::<i32>(headers, REMAINING_HEADER) {
            Some(remaining) => snapshot.remaining = remaining,
            None => warn!(header = REMAINING_HEADER, "unreadable rate limit header"),
        }
        match parse_header::<i64>(headers, RESET_HEADER) {
            Some(reset) => snapshot.reset = reset,
            None => warn!(header = RESET_HEADER, "unreadable rate limit header"),
        }
    }
}

/// Parse a numeric header value, if present and well-formed
fn parse_header<T: FromStr>(headers: &HeaderMap, name: &str) -> Option<T> {
    headers.get(name)?.to_str().ok()?.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quota_headers(limit: &str, remaining: &str, reset: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-rate-limit", "1".parse().unwrap());
        headers.insert("x-ratelimit-limit", limit.parse().unwrap());
        headers.insert("x-ratelimit-remaining", remaining.parse().unwrap());
        headers.insert("x-ratelimit-reset", reset.parse().unwrap());
        headers
    }

    #[test]
    fn test_update_overwrites_snapshot() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&quota_headers("500", "499", "1700000000"));
        assert_eq!(
            tracker.snapshot(),
            RateLimit {
                limit: 500,
                remaining: 499,
                reset: 1700000000,
            }
        );

        tracker.update_from_headers(&quota_headers("500", "498", "1700000100"));
        assert_eq!(tracker.snapshot().remaining, 498);
        assert_eq!(tracker.snapshot().reset, 1700000100);
    }

    #[test]
    fn test_no_update_without_probe_header() {
        let tracker = RateLimitTracker::new();

        let mut headers = HeaderMap::new();
        headers.insert("x-ratelimit-limit", "500".parse().unwrap());
        headers.insert("x-ratelimit-remaining", "1".parse().unwrap());
        headers.insert("x-ratelimit-reset", "1700000000".parse().unwrap());

        tracker.update_from_headers(&headers);
        assert_eq!(tracker.snapshot(), RateLimit::default());
    }

    #[test]
    fn test_bad_value_keeps_previous_field() {
        let tracker = RateLimitTracker::new();
        tracker.update_from_headers(&quota_headers("500", "499", "1700000000"));
        tracker.update_from_headers(&quota_headers("500", "not-a-number", "1700000100"));

        let snapshot = tracker.snapshot();
        assert_eq!(snapshot.remaining, 499);
        assert_eq!(snapshot.reset, 1700000100);
    }

    #[test]
    fn test_reset_at_conversion() {
        let quota = RateLimit {
            limit: 500,
            remaining: 499,
            reset: 0,
        };
        assert_eq!(
            quota.reset_at().unwrap().to_rfc3339(),
            "1970-01-01T00:00:00+00:00"
        );
    }
}
