//! HTTP Client
//!
//! Async transport for the Nitrapi JSON envelope contract: build encoded
//! query strings and form bodies, send bearer-authenticated requests, unwrap
//! the `{status, message, data}` envelope and track quota headers.

use crate::client::rate_limit::{RateLimit, RateLimitTracker};
use crate::error::{NitrapiError, Result};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use reqwest::header::{HeaderMap, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use tracing::debug;

/// A live response byte stream; the caller owns and drives it
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send>>;

/// An ordered key/value request parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub key: String,

    /// Parameter value, percent-encoded when serialized
    pub value: String,
}

impl Parameter {
    /// Create a new parameter
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl From<(&str, &str)> for Parameter {
    fn from((key, value): (&str, &str)) -> Self {
        Self::new(key, value)
    }
}

/// Transport configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// User agent sent with every request
    pub user_agent: String,

    /// Initial locale appended to every structured request
    pub locale: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("nitrapi-rs/{}", env!("CARGO_PKG_VERSION")),
            locale: "en".to_string(),
        }
    }
}

/// The five Nitrapi transport operations plus session state accessors
///
/// Implemented by [`ProductionHttpClient`] for real traffic; test doubles
/// implement the same trait.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// GET with parameters in the query string; returns the envelope's `data`
    async fn data_get(
        &self,
        url: &str,
        access_token: &str,
        params: &[Parameter],
    ) -> Result<serde_json::Value>;

    /// POST with parameters as a form-encoded body; returns the envelope's `data`
    async fn data_post(
        &self,
        url: &str,
        access_token: &str,
        params: &[Parameter],
    ) -> Result<serde_json::Value>;

    /// DELETE with parameters as a form-encoded body; returns the envelope's `data`
    ///
    /// The API expects DELETE requests to carry a body.
    async fn data_delete(
        &self,
        url: &str,
        access_token: &str,
        params: &[Parameter],
    ) -> Result<serde_json::Value>;

    /// Unauthenticated GET returning the live response stream
    async fn raw_get(&self, url: &str) -> Result<ByteStream>;

    /// POST an opaque binary body with a `Token` header.
    ///
    /// The response is parsed only for the envelope status check and then
    /// discarded. This path never updates the rate limit snapshot.
    async fn raw_post(&self, url: &str, token: &str, body: Bytes) -> Result<()>;

    /// Last observed rate limit snapshot
    fn rate_limit(&self) -> RateLimit;

    /// Set the locale used by the structured operations; not validated
    fn set_language(&self, lang: &str);

    /// Current locale
    fn language(&self) -> String;
}

/// HTTP client that actually connects to the internet and gets the data
pub struct ProductionHttpClient {
    /// Inner reqwest client
    client: Client,

    /// Locale appended to every structured request
    locale: parking_lot::RwLock<String>,

    /// Rate limit tracker
    rate_limit: RateLimitTracker,
}

impl ProductionHttpClient {
    /// Create a client with the default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(HttpClientConfig::default())
    }

    /// Create a client with a custom configuration.
    ///
    /// No request timeout is configured: a hung network call blocks the
    /// caller indefinitely.
    pub fn with_config(config: HttpClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self {
            client,
            locale: parking_lot::RwLock::new(config.locale),
            rate_limit: RateLimitTracker::new(),
        })
    }

    /// Shared request cycle for the three structured operations.
    async fn request_envelope(
        &self,
        method: Method,
        url: &str,
        access_token: &str,
        params: &[Parameter],
    ) -> Result<serde_json::Value> {
        let locale = self.language();

        let mut request = if method == Method::GET {
            let full_url = build_query_url(url, params, &locale);
            debug!(method = %method, url = %full_url, "nitrapi request");
            self.client.get(full_url)
        } else {
            let full_url = format!("{}?locale={}", url, encode(&locale));
            debug!(method = %method, url = %full_url, "nitrapi request");
            self.client
                .request(method, full_url)
                .body(build_form_body(params))
        };
        request = request.header(AUTHORIZATION, format!("Bearer {}", access_token));

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.text().await?;

        self.parse_envelope(status, &headers, &body)
    }

    /// Apply the envelope contract to a response body.
    ///
    /// The rate limit snapshot updates right after a successful parse, before
    /// the status check, so envelope error responses still refresh it.
    fn parse_envelope(
        &self,
        status: u16,
        headers: &HeaderMap,
        body: &str,
    ) -> Result<serde_json::Value> {
        let result = parse_object(status, body)?;

        self.rate_limit.update_from_headers(headers);

        check_envelope_status(&result, status)?;

        // return the interesting subobject
        if let Some(data) = result.get("data") {
            if !data.is_null() {
                return Ok(data.clone());
            }
        }
        Ok(serde_json::Value::Object(result))
    }
}

impl Default for ProductionHttpClient {
    fn default() -> Self {
        Self::new().expect("Failed to create default HTTP client")
    }
}

#[async_trait]
impl HttpClient for ProductionHttpClient {
    async fn data_get(
        &self,
        url: &str,
        access_token: &str,
        params: &[Parameter],
    ) -> Result<serde_json::Value> {
        self.request_envelope(Method::GET, url, access_token, params)
            .await
    }

    async fn data_post(
        &self,
        url: &str,
        access_token: &str,
        params: &[Parameter],
    ) -> Result<serde_json::Value> {
        self.request_envelope(Method::POST, url, access_token, params)
            .await
    }

    async fn data_delete(
        &self,
        url: &str,
        access_token: &str,
        params: &[Parameter],
    ) -> Result<serde_json::Value> {
        self.request_envelope(Method::DELETE, url, access_token, params)
            .await
    }

    async fn raw_get(&self, url: &str) -> Result<ByteStream> {
        use async_stream::stream;
        use futures::StreamExt;

        debug!(url = %url, "nitrapi raw get");
        let response = self.client.get(url).send().await?.error_for_status()?;

        let mut byte_stream = response.bytes_stream();
        let s = stream! {
            while let Some(chunk) = byte_stream.next().await {
                yield chunk.map_err(NitrapiError::from);
            }
        };

        Ok(Box::pin(s))
    }

    async fn raw_post(&self, url: &str, token: &str, body: Bytes) -> Result<()> {
        debug!(url = %url, bytes = body.len(), "nitrapi raw post");
        let response = self
            .client
            .post(url)
            .header("Token", token)
            .header(CONTENT_TYPE, "application/binary")
            .body(body)
            .send()
            .await?;

        let status = response.status().as_u16();
        let text = response.text().await?;

        let result = parse_object(status, &text)?;
        check_envelope_status(&result, status)?;

        Ok(())
    }

    fn rate_limit(&self) -> RateLimit {
        self.rate_limit.snapshot()
    }

    fn set_language(&self, lang: &str) {
        *self.locale.write() = lang.to_string();
    }

    fn language(&self) -> String {
        self.locale.read().clone()
    }
}

/// Percent-encode a query/body component with form-encoding rules (UTF-8)
fn encode(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Build the full GET url: every parameter as `key=value`, then the locale.
///
/// The first separator is `?` even with zero parameters, because the locale
/// pair is always appended last.
fn build_query_url(url: &str, params: &[Parameter], locale: &str) -> String {
    let mut full_url = String::from(url);
    let mut first = true;

    for param in params {
        full_url.push(if first { '?' } else { '&' });
        full_url.push_str(&encode(&param.key));
        full_url.push('=');
        full_url.push_str(&encode(&param.value));
        first = false;
    }

    full_url.push(if first { '?' } else { '&' });
    full_url.push_str("locale=");
    full_url.push_str(&encode(locale));

    full_url
}

/// Build a `key=value&key=value` form body with the same encoding rules
fn build_form_body(params: &[Parameter]) -> String {
    let mut body = String::new();

    for param in params {
        if !body.is_empty() {
            body.push('&');
        }
        body.push_str(&encode(&param.key));
        body.push('=');
        body.push_str(&encode(&param.value));
    }

    body
}

/// Parse a response body as a JSON object, rejecting empty bodies
fn parse_object(status: u16, body: &str) -> Result<serde_json::Map<String, serde_json::Value>> {
    if body.is_empty() {
        return Err(NitrapiError::EmptyResult { status });
    }

    match serde_json::from_str::<serde_json::Value>(body)? {
        serde_json::Value::Object(map) => Ok(map),
        other => Err(NitrapiError::Response(format!(
            "expected a JSON object, got {}",
            json_type_name(&other)
        ))),
    }
}

/// Fail unless the envelope's `status` field equals `"success"`.
///
/// The field is effectively required by this API; a missing or non-string
/// value is a malformed envelope.
fn check_envelope_status(
    result: &serde_json::Map<String, serde_json::Value>,
    status: u16,
) -> Result<()> {
    let envelope_status = result
        .get("status")
        .and_then(serde_json::Value::as_str)
        .ok_or_else(|| NitrapiError::Response("missing status field in envelope".to_string()))?;

    if envelope_status != "success" {
        return Err(NitrapiError::Api {
            message: result
                .get("message")
                .and_then(serde_json::Value::as_str)
                .unwrap_or_default()
                .to_string(),
            status,
        });
    }

    Ok(())
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url_locale_only() {
        assert_eq!(
            build_query_url("https://api.nitrado.net/ping", &[], "en"),
            "https://api.nitrado.net/ping?locale=en"
        );
    }

    #[test]
    fn test_query_url_locale_last() {
        let params = [Parameter::new("search", "minecraft"), ("limit", "5").into()];
        assert_eq!(
            build_query_url("https://api.nitrado.net/services", &params, "de"),
            "https://api.nitrado.net/services?search=minecraft&limit=5&locale=de"
        );
    }

    #[test]
    fn test_query_url_encodes_pairs() {
        let params = [Parameter::new("message of day", "hi & welcome ü")];
        assert_eq!(
            build_query_url("http://host/x", &params, "en"),
            "http://host/x?message+of+day=hi+%26+welcome+%C3%BC&locale=en"
        );
    }

    #[test]
    fn test_form_body_joins_with_ampersand() {
        let params = [
            Parameter::new("name", "my server"),
            Parameter::new("slots", "12"),
        ];
        assert_eq!(build_form_body(&params), "name=my+server&slots=12");
    }

    #[test]
    fn test_form_body_empty_params() {
        assert_eq!(build_form_body(&[]), "");
    }

    #[test]
    fn test_parse_object_rejects_empty_body() {
        let err = parse_object(503, "").unwrap_err();
        assert!(matches!(err, NitrapiError::EmptyResult { status: 503 }));
    }

    #[test]
    fn test_parse_object_rejects_non_object() {
        let err = parse_object(200, "[1,2,3]").unwrap_err();
        assert!(matches!(err, NitrapiError::Response(_)));
    }

    #[test]
    fn test_envelope_status_failure_carries_message() {
        let result = serde_json::json!({
            "status": "error",
            "message": "Access token invalid"
        });
        let err = check_envelope_status(result.as_object().unwrap(), 401).unwrap_err();
        match err {
            NitrapiError::Api { message, status } => {
                assert_eq!(message, "Access token invalid");
                assert_eq!(status, 401);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_envelope_status_required() {
        let result = serde_json::json!({ "data": {} });
        let err = check_envelope_status(result.as_object().unwrap(), 200).unwrap_err();
        assert!(matches!(err, NitrapiError::Response(_)));
    }
}
