//! The client's captured response: status, headers, body bytes, and the
//! bookkeeping (duration, protocol) the spec's data model asks for.
//!
//! Immutable once built — a response middleware that wants to change what
//! gets cached or returned to the caller works by replacing the whole
//! [`ClientResponse`] (see [`crate::client::middleware::ResponseMiddleware`]),
//! not by mutating fields in place.

use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;

use crate::codec::CodecRegistry;
use crate::error::Error;

/// Which request produced a [`ClientResponse`] — the method and the final
/// URL actually called, after path-param substitution and any redirects
/// followed. Not the full [`crate::client::ClientRequest`] builder: once a
/// response exists the builder has already been consumed, and a retry or
/// redirect hop may have sent more than one request on the way to it.
#[derive(Clone, Debug)]
pub struct RequestBackref {
    pub(crate) method: http::Method,
    pub(crate) url: url::Url,
}

impl RequestBackref {
    pub fn method(&self) -> &http::Method {
        &self.method
    }

    pub fn url(&self) -> &url::Url {
        &self.url
    }
}

pub struct ClientResponse {
    pub(crate) status: StatusCode,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) duration: Duration,
    pub(crate) proto: &'static str,
    pub(crate) request: RequestBackref,
}

impl ClientResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// The status line's reason phrase (`"Not Found"` for 404), or `""` for
    /// a non-standard code `http` doesn't recognize.
    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or("")
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn proto(&self) -> &'static str {
        self.proto
    }

    /// The method and final URL of the request that produced this response.
    pub fn request(&self) -> &RequestBackref {
        &self.request
    }

    /// `Content-Type` with any `;...` parameters stripped and lowercased —
    /// the key the codec registry is looked up by.
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(crate::codec::normalize)
    }

    /// Whether the response carries an HTTP error status (`>= 400`). Per
    /// the spec's error taxonomy, this is a *successful* client outcome —
    /// it's surfaced to the caller as a normal response, not an `Err`,
    /// unless a response middleware decides otherwise.
    pub fn is_http_error(&self) -> bool {
        self.status.as_u16() >= 400
    }

    /// Decodes the body through `registry`, selecting the codec by this
    /// response's `Content-Type` (falling back to the registry's default).
    pub fn decode<T: DeserializeOwned>(&self, registry: &CodecRegistry) -> Result<T, Error> {
        registry.decode(self.content_type().as_deref(), &self.body)
    }

    pub fn text(&self) -> Result<String, Error> {
        String::from_utf8(self.body.to_vec())
            .map_err(|_| Error::InvalidDataFormat("response body is not valid utf-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(status: u16, content_type: &str, body: &str) -> ClientResponse {
        let mut headers = HeaderMap::new();
        headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_str(content_type).unwrap(),
        );
        ClientResponse {
            status: StatusCode::from_u16(status).unwrap(),
            headers,
            body: Bytes::from(body.to_string()),
            duration: Duration::from_millis(1),
            proto: "HTTP/1.1",
            request: RequestBackref { method: http::Method::GET, url: url::Url::parse("https://example.com/x").unwrap() },
        }
    }

    #[test]
    fn decodes_json_body_by_content_type() {
        let resp = sample(200, "application/json; charset=utf-8", r#"{"x":1}"#);
        let value: serde_json::Value = resp.decode(&CodecRegistry::with_defaults()).unwrap();
        assert_eq!(value["x"], 1);
    }

    #[test]
    fn is_http_error_true_for_4xx_and_5xx() {
        assert!(sample(404, "text/plain", "").is_http_error());
        assert!(sample(500, "text/plain", "").is_http_error());
        assert!(!sample(200, "text/plain", "").is_http_error());
    }
}
