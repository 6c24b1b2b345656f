//! Nitrapi Error Types
//!
//! Error handling for the Nitrapi client transport.

use thiserror::Error;

/// Main error type for Nitrapi operations
///
/// Two broad kinds are distinguishable for callers: transport failures
/// ([`Http`](NitrapiError::Http), [`EmptyResult`](NitrapiError::EmptyResult),
/// [`Response`](NitrapiError::Response)) and application failures reported
/// inside the API envelope ([`Api`](NitrapiError::Api)).
#[derive(Debug, Error)]
pub enum NitrapiError {
    /// Network or protocol level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an empty body
    #[error("empty result (HTTP {status})")]
    EmptyResult {
        /// HTTP status code of the empty response
        status: u16,
    },

    /// Response body was not the expected JSON envelope
    #[error("invalid response: {0}")]
    Response(String),

    /// The API reported a failure in its envelope (`status != "success"`)
    #[error("{message} (HTTP {status})")]
    Api {
        /// Message carried in the envelope's `message` field
        message: String,
        /// HTTP status code of the response
        status: u16,
    },
}

impl NitrapiError {
    /// HTTP status code carried by this error, when one is known.
    ///
    /// Lets callers branch on quota/auth failures versus connectivity
    /// failures without matching on variants.
    pub fn status(&self) -> Option<u16> {
        match self {
            NitrapiError::Http(err) => err.status().map(|s| s.as_u16()),
            NitrapiError::EmptyResult { status } => Some(*status),
            NitrapiError::Response(_) => None,
            NitrapiError::Api { status, .. } => Some(*status),
        }
    }
}

impl From<serde_json::Error> for NitrapiError {
    fn from(err: serde_json::Error) -> Self {
        NitrapiError::Response(format!("JSON parsing error: {}", err))
    }
}

/// Result type alias for Nitrapi operations
pub type Result<T> = std::result::Result<T, NitrapiError>;
