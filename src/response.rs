//! Outgoing response state: the per-request write-once facade handlers use
//! to build a reply, and the hyper response it collapses into.

use bytes::{Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header};
use http_body_util::Full;
use serde::Serialize;

use crate::error::Error;

/// The response half of a [`crate::Context`].
///
/// # Status and the first write
///
/// `status(..)` records the status to send; calling it again before the
/// response is flushed simply updates the recorded value — there is no
/// wire effect either way, since nothing is sent until the handler chain
/// finishes. Once [`flush`](ResponseWriter::flush) has run (explicitly, or
/// implicitly when a streaming/hijacked response starts writing to the
/// socket directly), further `status`/`header` calls are recorded but can
/// no longer change what has already gone out.
///
/// A body write with no prior `status(..)` call implicitly fixes the
/// status at `200 OK` — mirroring the common "if nobody set a status and
/// you're writing a body, it's a success" convention.
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: BytesMut,
    flushed: bool,
}

impl ResponseWriter {
    pub(crate) fn new() -> Self {
        Self {
            status: None,
            headers: HeaderMap::new(),
            body: BytesMut::new(),
            flushed: false,
        }
    }

    /// Sets (or updates) the response status code.
    pub fn status(&mut self, code: StatusCode) -> &mut Self {
        self.status = Some(code);
        self
    }

    /// Returns the status that will be sent if the response ended right
    /// now: the explicitly set status, or `200 OK` if a body has been
    /// written with none set, or `204 No Content` if nothing has been
    /// written at all.
    pub fn status_code(&self) -> StatusCode {
        self.status.unwrap_or(if self.body.is_empty() {
            StatusCode::NO_CONTENT
        } else {
            StatusCode::OK
        })
    }

    pub fn header(&mut self, name: HeaderName, value: HeaderValue) -> &mut Self {
        if !self.flushed {
            self.headers.insert(name, value);
        }
        self
    }

    /// Appends raw bytes to the body. Implicitly fixes the status at `200
    /// OK` if nothing set one yet.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) -> &mut Self {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(bytes.as_ref());
        self
    }

    /// `text/plain; charset=utf-8` convenience.
    pub fn text(&mut self, body: impl AsRef<str>) -> &mut Self {
        self.header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/plain; charset=utf-8"),
        );
        self.write(body.as_ref().as_bytes())
    }

    /// `application/json` convenience, serialized with `serde_json`.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<&mut Self, Error> {
        let bytes =
            serde_json::to_vec(value).map_err(|_| Error::InvalidDataFormat("value is not JSON-serializable"))?;
        self.header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(self.write(bytes))
    }

    /// Marks the response as flushed: headers are now considered sent.
    /// For the buffered (non-hijacked) path this has no observable effect
    /// on the wire output, since the whole response is written once at the
    /// end of the handler chain regardless — it exists so middleware that
    /// inspects `is_flushed` (e.g. to decide whether it is still safe to
    /// rewrite the status on an error) sees the same contract a streaming
    /// transport would enforce.
    pub fn flush(&mut self) {
        self.flushed = true;
    }

    pub fn is_flushed(&self) -> bool {
        self.flushed
    }

    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    pub(crate) fn into_hyper(self) -> http::Response<Full<Bytes>> {
        let status = self.status_code();
        let mut res = http::Response::new(Full::new(self.body.freeze()));
        *res.status_mut() = status;
        *res.headers_mut() = self.headers;
        res
    }
}
