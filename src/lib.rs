//! Nitrapi - Nitrado API client transport
//!
//! Async HTTP transport for the Nitrado REST API. Structured operations send
//! bearer-authenticated GET/POST/DELETE requests, unwrap the
//! `{status, message, data}` JSON envelope and track the API's rate limit
//! headers; raw operations move opaque bytes past the envelope contract.
//!
//! ```no_run
//! use nitrapi::{HttpClient, Parameter, ProductionHttpClient};
//!
//! # async fn example() -> nitrapi::Result<()> {
//! let client = ProductionHttpClient::new()?;
//! let services = client
//!     .data_get(
//!         "https://api.nitrado.net/services",
//!         "my-access-token",
//!         &[Parameter::new("search", "minecraft")],
//!     )
//!     .await?;
//! println!("{services}");
//! println!("remaining quota: {}", client.rate_limit().remaining);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;

pub use client::{
    ByteStream, HttpClient, HttpClientConfig, Parameter, ProductionHttpClient, RateLimit,
};
pub use error::{NitrapiError, Result};
