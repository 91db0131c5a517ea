//! Incoming request data: method, path, headers, query, path params, body.

use bytes::Bytes;
use http::{HeaderMap, Method};
use std::net::SocketAddr;

use crate::query::Query;

/// The parts of an incoming HTTP request a handler can read.
///
/// Lives inside [`crate::Context`] as `ctx.request`. Path parameters are
/// populated by the matcher before the handler chain runs; the query
/// string is parsed lazily the first time [`Request::query`] is called and
/// cached for the rest of the request's lifetime.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) path: String,
    pub(crate) raw_query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: Vec<(String, String)>,
    pub(crate) remote_addr: Option<SocketAddr>,
    query_cache: std::cell::OnceCell<Query>,
}

impl Request {
    pub(crate) fn new(
        method: Method,
        path: String,
        raw_query: Option<String>,
        headers: HeaderMap,
        body: Bytes,
        params: Vec<(String, String)>,
        remote_addr: Option<SocketAddr>,
    ) -> Self {
        Self {
            method,
            path,
            raw_query,
            headers,
            body,
            params,
            remote_addr,
            query_cache: std::cell::OnceCell::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path component only — no query string, no fragment.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Case-insensitive header lookup, first value only.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// `Content-Type` without parameters (`application/json; charset=utf-8`
    /// becomes `application/json`), normalized to lowercase — the key the
    /// [`crate::codec`] registry is keyed on.
    pub fn content_type(&self) -> Option<String> {
        self.header(http::header::CONTENT_TYPE.as_str())
            .map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
    }

    /// A named path parameter captured by the route pattern, e.g.
    /// `req.param("id")` on a `/users/:id` route matched against
    /// `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// The parsed query string, computed and cached on first access.
    pub fn query(&self) -> &Query {
        self.query_cache.get_or_init(|| match &self.raw_query {
            Some(raw) => crate::query::parse(raw),
            None => Query::default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn req(headers: HeaderMap, params: Vec<(String, String)>, raw_query: Option<&str>) -> Request {
        Request::new(
            Method::GET,
            "/users/42".to_string(),
            raw_query.map(str::to_string),
            headers,
            Bytes::new(),
            params,
            None,
        )
    }

    #[test]
    fn param_looks_up_by_name() {
        let r = req(HeaderMap::new(), vec![("id".to_string(), "42".to_string())], None);
        assert_eq!(r.param("id"), Some("42"));
        assert_eq!(r.param("missing"), None);
    }

    #[test]
    fn content_type_strips_parameters_and_lowercases() {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::CONTENT_TYPE, HeaderValue::from_static("Application/JSON; charset=utf-8"));
        let r = req(headers, Vec::new(), None);
        assert_eq!(r.content_type().as_deref(), Some("application/json"));
    }

    #[test]
    fn query_is_parsed_lazily_and_cached() {
        let r = req(HeaderMap::new(), Vec::new(), Some("a=1&a=2"));
        let first = r.query() as *const Query;
        let second = r.query() as *const Query;
        assert_eq!(first, second);
        assert_eq!(r.query().get_all("a"), &["1".to_string(), "2".to_string()]);
    }

    #[test]
    fn no_raw_query_yields_empty_query() {
        let r = req(HeaderMap::new(), Vec::new(), None);
        assert!(r.query().is_empty());
    }
}
