//! Client request builder: the typed value an application constructs and
//! hands to [`crate::client::Client::execute`], and the resolution step
//! that turns it plus the client's defaults into a transport-ready request.

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, header};
use serde::Serialize;
use tokio::io::AsyncRead;

use crate::cancel::CancelToken;
use crate::client::{Client, UploadConfig};
use crate::client::transport::TransportBody;
use crate::codec::CodecRegistry;
use crate::error::Error;
use crate::url as urlutil;

/// An unresolved request body, as the caller supplied it. Resolved into
/// bytes (or a stream) by [`ClientRequest::resolve`] according to the
/// body-type dispatch table in the spec (§4.4).
pub enum Body {
    Empty,
    Bytes(Bytes),
    Text(String),
    /// Read at resolution time rather than buffered whole-hog: whether it
    /// ends up fully buffered or streamed depends on the client's
    /// [`UploadConfig`] and the optional size hint carried alongside the
    /// reader (§4.4 body dispatch, §6 upload streaming knob).
    Reader(Pin<Box<dyn AsyncRead + Send>>, Option<u64>),
    Form(Vec<(String, String)>),
    /// Anything else: serialized through the codec registry by content
    /// type (default `application/json`). Converted to `Value` immediately
    /// on construction so `ClientRequest` stays cloneable.
    Value(serde_json::Value),
}

impl Body {
    pub fn json(value: impl Serialize) -> Result<Self, Error> {
        serde_json::to_value(value)
            .map(Body::Value)
            .map_err(|_| Error::InvalidDataFormat("value is not JSON-serializable"))
    }

    /// A body read from an `AsyncRead` source. `size_hint`, if known (e.g.
    /// a file's length), lets the builder decide to stream without reading
    /// anything up front; without it, streaming only kicks in when the
    /// client's [`UploadConfig::use_streaming`] is set unconditionally.
    pub fn reader(reader: impl AsyncRead + Send + 'static, size_hint: Option<u64>) -> Self {
        Body::Reader(Box::pin(reader), size_hint)
    }
}

/// Cache participation for a single request. Only consulted for `GET`
/// (spec §4.5 step 2); the key defaults to the final resolved URL.
#[derive(Clone)]
pub struct CacheDirective {
    pub enabled: bool,
    pub key: Option<String>,
    pub ttl: Duration,
}

impl Default for CacheDirective {
    fn default() -> Self {
        Self { enabled: false, key: None, ttl: Duration::from_secs(60) }
    }
}

pub struct ClientRequest {
    pub(crate) method: Method,
    pub(crate) target: String,
    pub(crate) path_params: Vec<(String, String)>,
    pub(crate) query: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) cookies: Vec<(String, String)>,
    pub(crate) body: Body,
    pub(crate) cache: Option<CacheDirective>,
    pub(crate) cancel: Option<CancelToken>,
    pub(crate) content_type_override: Option<String>,
}

impl ClientRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            path_params: Vec::new(),
            query: Vec::new(),
            headers: HeaderMap::new(),
            cookies: Vec::new(),
            body: Body::Empty,
            cache: None,
            cancel: None,
            content_type_override: None,
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.push((name.into(), value.into()));
        self
    }

    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Body) -> Self {
        self.body = body;
        self
    }

    pub fn json(self, value: impl Serialize) -> Result<Self, Error> {
        let body = Body::json(value)?;
        Ok(self.body(body))
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type_override = Some(content_type.into());
        self
    }

    /// Enables caching for this request (only takes effect for `GET`).
    /// `key` defaults to the resolved URL if not supplied.
    pub fn use_cache(mut self, ttl: Duration) -> Self {
        self.cache = Some(CacheDirective { enabled: true, key: None, ttl });
        self
    }

    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        let ttl = self.cache.as_ref().map(|c| c.ttl).unwrap_or(Duration::from_secs(60));
        self.cache = Some(CacheDirective { enabled: true, key: Some(key.into()), ttl });
        self
    }

    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Clones everything except a `Reader` body, which cannot be cloned
    /// (the underlying stream can only be read once); a cloned request
    /// with a reader body gets an empty one instead.
    pub fn try_clone(&self) -> Self {
        let body = match &self.body {
            Body::Empty => Body::Empty,
            Body::Bytes(b) => Body::Bytes(b.clone()),
            Body::Text(s) => Body::Text(s.clone()),
            Body::Form(v) => Body::Form(v.clone()),
            Body::Value(v) => Body::Value(v.clone()),
            Body::Reader(..) => {
                tracing::debug!("client request clone: reader body cannot be duplicated, using empty body");
                Body::Empty
            }
        };
        Self {
            method: self.method.clone(),
            target: self.target.clone(),
            path_params: self.path_params.clone(),
            query: self.query.clone(),
            headers: self.headers.clone(),
            cookies: self.cookies.clone(),
            body,
            cache: self.cache.clone(),
            cancel: self.cancel.clone(),
            content_type_override: self.content_type_override.clone(),
        }
    }

    /// Resolves this request against `client`'s defaults: substitutes path
    /// params, joins the base URL, appends the query, encodes the body,
    /// merges headers and cookies. Spec §4.4.
    pub(crate) async fn resolve(self, client: &Client) -> Result<Resolved, Error> {
        let substituted = urlutil::substitute_path_params(&self.target, &self.path_params);
        let mut resolved_url = urlutil::resolve(client.base_url(), &substituted)?;
        urlutil::append_query(&mut resolved_url, &self.query);

        let (encoded_content_type, body) =
            encode_body(self.body, self.content_type_override.as_deref(), client.codecs(), client.upload_config()).await?;

        let mut headers = client.default_headers().clone();
        for (name, value) in self.headers.iter() {
            headers.insert(name.clone(), value.clone());
        }
        if !headers.contains_key(header::USER_AGENT) {
            headers.insert(header::USER_AGENT, HeaderValue::from_static("corehttp/0.1"));
        }
        if let Some(ct) = encoded_content_type {
            if !headers.contains_key(header::CONTENT_TYPE) {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_str(&ct).map_err(|_| Error::InvalidDataFormat("invalid content-type"))?);
            }
        }

        let mut cookie_pairs = client.cookies().snapshot_for(&resolved_url);
        cookie_pairs.extend(self.cookies);
        if !cookie_pairs.is_empty() {
            let joined = cookie_pairs
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            headers.insert(header::COOKIE, HeaderValue::from_str(&joined).map_err(|_| Error::InvalidDataFormat("invalid cookie value"))?);
        }

        let (cache_key, cache_ttl) = match self.cache {
            Some(dir) if dir.enabled && self.method == Method::GET => {
                (Some(dir.key.unwrap_or_else(|| resolved_url.to_string())), Some(dir.ttl))
            }
            _ => (None, None),
        };

        Ok(Resolved {
            method: self.method,
            url: resolved_url,
            headers,
            body,
            cache_key,
            cache_ttl,
            cancel: self.cancel.unwrap_or_default(),
        })
    }
}

async fn encode_body(
    body: Body,
    content_type_override: Option<&str>,
    codecs: &CodecRegistry,
    upload: UploadConfig,
) -> Result<(Option<String>, TransportBody), Error> {
    match body {
        Body::Empty => Ok((None, TransportBody::Empty)),
        Body::Bytes(b) => Ok((content_type_override.map(str::to_string), TransportBody::Bytes(b))),
        Body::Text(s) => {
            let ct = content_type_override.map(str::to_string).unwrap_or_else(|| "text/plain; charset=utf-8".to_string());
            Ok((Some(ct), TransportBody::Bytes(Bytes::from(s))))
        }
        Body::Reader(reader, size_hint) => {
            let ct = content_type_override.map(str::to_string);
            let exceeds_threshold = size_hint.is_some_and(|n| n >= upload.large_file_threshold);
            if upload.use_streaming || exceeds_threshold {
                Ok((ct, TransportBody::Stream(reader, upload.stream_chunk_size)))
            } else {
                use tokio::io::AsyncReadExt;
                let mut reader = reader;
                let mut buf = Vec::new();
                reader
                    .as_mut()
                    .read_to_end(&mut buf)
                    .await
                    .map_err(Error::from)?;
                Ok((ct, TransportBody::Bytes(Bytes::from(buf))))
            }
        }
        Body::Form(pairs) => {
            let mut out = form_urlencoded::Serializer::new(String::new());
            for (k, v) in &pairs {
                out.append_pair(k, v);
            }
            Ok((
                Some("application/x-www-form-urlencoded".to_string()),
                TransportBody::Bytes(Bytes::from(out.finish())),
            ))
        }
        Body::Value(value) => {
            let (content_type, bytes) = codecs.encode(content_type_override.or(Some("application/json")), &value)?;
            Ok((Some(content_type), TransportBody::Bytes(bytes)))
        }
    }
}

pub(crate) struct Resolved {
    pub method: Method,
    pub url: url::Url,
    pub headers: HeaderMap,
    pub body: TransportBody,
    pub cache_key: Option<String>,
    pub cache_ttl: Option<Duration>,
    pub cancel: CancelToken,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::task::{Context as TaskContext, Poll};
    use tokio::io::ReadBuf;

    /// Minimal `AsyncRead` over an in-memory buffer — `std::io::Cursor`
    /// doesn't implement tokio's `AsyncRead`, and pulling in a whole extra
    /// crate just to hand a fixed byte slice to these tests isn't worth it.
    struct VecReader {
        data: Vec<u8>,
        pos: usize,
    }

    impl VecReader {
        fn new(data: Vec<u8>) -> Self {
            Self { data, pos: 0 }
        }
    }

    impl AsyncRead for VecReader {
        fn poll_read(self: Pin<&mut Self>, _cx: &mut TaskContext<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
            let this = self.get_mut();
            let remaining = &this.data[this.pos..];
            let n = remaining.len().min(buf.remaining());
            buf.put_slice(&remaining[..n]);
            this.pos += n;
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn bytes_body_has_no_implicit_content_type() {
        let (ct, body) = encode_body(Body::Bytes(Bytes::from_static(b"raw")), None, &CodecRegistry::with_defaults(), UploadConfig::default())
            .await
            .unwrap();
        assert_eq!(ct, None);
        assert!(matches!(body, TransportBody::Bytes(b) if b == Bytes::from_static(b"raw")));
    }

    #[tokio::test]
    async fn text_body_defaults_to_plain_text_charset() {
        let (ct, _) = encode_body(Body::Text("hi".to_string()), None, &CodecRegistry::with_defaults(), UploadConfig::default())
            .await
            .unwrap();
        assert_eq!(ct.as_deref(), Some("text/plain; charset=utf-8"));
    }

    #[tokio::test]
    async fn form_body_encodes_as_urlencoded() {
        let (ct, body) = encode_body(
            Body::Form(vec![("a".to_string(), "1".to_string()), ("b".to_string(), "x y".to_string())]),
            None,
            &CodecRegistry::with_defaults(),
            UploadConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(ct.as_deref(), Some("application/x-www-form-urlencoded"));
        let TransportBody::Bytes(bytes) = body else { panic!("expected bytes body") };
        assert_eq!(&*bytes, b"a=1&b=x+y".as_slice());
    }

    #[tokio::test]
    async fn value_body_defaults_to_json_codec() {
        let (ct, body) = encode_body(
            Body::json(serde_json::json!({"k": "v"})).unwrap(),
            None,
            &CodecRegistry::with_defaults(),
            UploadConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(ct.as_deref(), Some("application/json"));
        let TransportBody::Bytes(bytes) = body else { panic!("expected bytes body") };
        assert_eq!(&*bytes, br#"{"k":"v"}"#.as_slice());
    }

    #[tokio::test]
    async fn small_reader_body_is_buffered_by_default() {
        let reader = VecReader::new(b"hello".to_vec());
        let (_, body) = encode_body(Body::reader(reader, Some(5)), None, &CodecRegistry::with_defaults(), UploadConfig::default())
            .await
            .unwrap();
        assert!(matches!(body, TransportBody::Bytes(b) if b == Bytes::from_static(b"hello")));
    }

    #[tokio::test]
    async fn reader_body_above_threshold_streams_without_buffering() {
        let reader = VecReader::new(vec![0u8; 1024]);
        let upload = UploadConfig { large_file_threshold: 100, ..UploadConfig::default() };
        let (_, body) = encode_body(Body::reader(reader, Some(1024)), None, &CodecRegistry::with_defaults(), upload)
            .await
            .unwrap();
        assert!(matches!(body, TransportBody::Stream(..)));
    }

    #[tokio::test]
    async fn use_streaming_forces_stream_regardless_of_size_hint() {
        let reader = VecReader::new(b"tiny".to_vec());
        let upload = UploadConfig { use_streaming: true, ..UploadConfig::default() };
        let (_, body) = encode_body(Body::reader(reader, None), None, &CodecRegistry::with_defaults(), upload)
            .await
            .unwrap();
        assert!(matches!(body, TransportBody::Stream(..)));
    }

    #[tokio::test]
    async fn try_clone_degrades_reader_body_to_empty() {
        let req = ClientRequest::post("/upload").body(Body::reader(VecReader::new(b"x".to_vec()), Some(1)));
        let cloned = req.try_clone();
        assert!(matches!(cloned.body, Body::Empty));
    }

    #[tokio::test]
    async fn resolve_merges_headers_and_sets_user_agent() {
        let client = Client::builder().base_url("https://api.example.com").build();
        let req = ClientRequest::get("/users/:id").path_param("id", "42");
        let resolved = req.resolve(&client).await.unwrap();
        assert_eq!(resolved.url.as_str(), "https://api.example.com/users/42");
        assert!(resolved.headers.contains_key(header::USER_AGENT));
    }

    #[tokio::test]
    async fn cache_key_defaults_to_resolved_url_for_get() {
        let client = Client::builder().base_url("https://api.example.com").build();
        let req = ClientRequest::get("/x").use_cache(Duration::from_secs(30));
        let resolved = req.resolve(&client).await.unwrap();
        assert_eq!(resolved.cache_key.as_deref(), Some("https://api.example.com/x"));
    }

    #[tokio::test]
    async fn cache_is_ignored_for_non_get_methods() {
        let client = Client::builder().base_url("https://api.example.com").build();
        let mut req = ClientRequest::post("/x");
        req.cache = Some(CacheDirective { enabled: true, key: None, ttl: Duration::from_secs(30) });
        let resolved = req.resolve(&client).await.unwrap();
        assert_eq!(resolved.cache_key, None);
    }
}
