//! Response model delivered by a successful request.
//!
//! A [`Response`] is a **fully buffered**, immutable value: the body text, status code and
//! reason, the normalized response headers and the final URL. Nothing about it changes after
//! construction.
//!
//! ## Notes
//! - `ok()` is derived from `status` on every call and is never stored.
//! - `status_text` defaults to `"OK"` only when [`ResponseOptions::status_text`] is `None`. An
//!   explicit empty string is kept as-is.
//! - [`Response::decode_json`] parses the body each time it is called. There is no cache, so
//!   repeated calls always give identical results.
//!
use crate::errors::DecodeError;
use crate::net::headers::Headers;
use futures::stream::{self, Once};
use futures::future::{self, Ready};
use serde::de::DeserializeOwned;

/// Options used when building a [`Response`]. `None` means "not provided".
#[derive(Debug, Clone, Default)]
pub struct ResponseOptions {
    /// Numeric status. Defaults to `200`.
    pub status: Option<u16>,
    /// Reason phrase. Defaults to `"OK"` when absent.
    pub status_text: Option<String>,
    /// Normalized response headers.
    pub headers: Headers,
    /// Final URL. Defaults to the empty string.
    pub url: Option<String>,
}

/// Successful outcome of a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response body as text
    pub body: String,
    /// Numeric HTTP status code (e.g., `200`, `404`)
    pub status: u16,
    /// Reason phrase (e.g., `"OK"`, `"Not Found"`)
    pub status_text: String,
    /// Response headers, case-insensitive
    pub headers: Headers,
    /// Final URL of the response (after redirects), or empty when unknown
    pub url: String,
}

impl Response {
    pub fn new(body: impl Into<String>, options: ResponseOptions) -> Self {
        Self {
            body: body.into(),
            status: options.status.unwrap_or(200),
            status_text: options.status_text.unwrap_or_else(|| "OK".to_string()),
            headers: options.headers,
            url: options.url.unwrap_or_default(),
        }
    }

    /// True when the status is in the `200..300` range.
    #[inline]
    pub fn ok(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parses the body as JSON.
    pub fn decode_json(&self) -> Result<serde_json::Value, DecodeError> {
        self.decode_json_as()
    }

    /// Parses the body as JSON into `T`.
    pub fn decode_json_as<T: DeserializeOwned>(&self) -> Result<T, DecodeError> {
        serde_json::from_str(&self.body).map_err(|e| DecodeError::new(&e))
    }

    /// Same as [`decode_json`](Self::decode_json), as an already-resolved stream that yields
    /// the value (or the error) once and then ends.
    pub fn json(&self) -> Once<Ready<Result<serde_json::Value, DecodeError>>> {
        stream::once(future::ready(self.decode_json()))
    }
}
