//! Client Module
//!
//! HTTP transport and rate limit tracking.

pub mod http;
pub mod rate_limit;

pub use http::{ByteStream, HttpClient, HttpClientConfig, Parameter, ProductionHttpClient};
pub use rate_limit::{RateLimit, RateLimitTracker};
