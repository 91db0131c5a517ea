//! Client execution engine: configuration, request building, and the
//! retrying/caching/middleware-wrapped execution loop (spec §4.4/§4.5).
//!
//! ```rust,no_run
//! use corehttp::client::{Client, ClientRequest};
//!
//! # async fn go() -> Result<(), corehttp::Error> {
//! let client = Client::builder().base_url("https://api.example.com").build();
//! let resp = client.execute(ClientRequest::get("/users/:id").path_param("id", "42")).await?;
//! println!("{}", resp.status());
//! # Ok(()) }
//! ```

pub mod cache;
pub mod cookie;
pub mod middleware;
pub mod redirect;
pub mod request;
pub mod response;
pub mod retry;
pub mod transport;

use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};

use http::HeaderMap;

pub use request::{Body, ClientRequest};
pub use response::{ClientResponse, RequestBackref};
pub use retry::RetryPolicy;

use crate::client::cache::Cache;
use crate::client::cookie::CookieJar;
use crate::client::middleware::{MiddlewareStack, RequestMiddleware, ResponseMiddleware};
use crate::client::redirect::RedirectPolicy;
use crate::client::transport::{HyperTransport, Transport, TransportBody, TransportRequest};
use crate::codec::CodecRegistry;
use crate::error::Error;

/// Upload streaming knob (spec §6): bodies above `large_file_threshold`
/// bypass buffering when `use_streaming` is set. Only reachable today
/// through [`ClientRequest::body`] with [`Body::Reader`] — the threshold
/// governs whether the builder hands the transport a buffered
/// [`TransportBody::Bytes`] or an unbuffered [`TransportBody::Stream`].
#[derive(Clone, Copy)]
pub struct UploadConfig {
    pub large_file_threshold: u64,
    pub use_streaming: bool,
    pub stream_chunk_size: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self { large_file_threshold: 10 * 1024 * 1024, use_streaming: false, stream_chunk_size: 64 * 1024 }
    }
}

/// Long-lived, thread-safe client configuration and execution engine. See
/// the data-model section of the spec: default headers are immutable after
/// [`build`](ClientBuilder::build), the cookie jar and middleware lists
/// each have their own lock.
pub struct Client {
    base_url: Option<String>,
    default_headers: HeaderMap,
    cookies: CookieJar,
    retry: RwLock<RetryPolicy>,
    redirect: RedirectPolicy,
    middleware: RwLock<MiddlewareStack>,
    cache: Option<Arc<dyn Cache>>,
    codecs: CodecRegistry,
    transport: Arc<dyn Transport>,
    upload: UploadConfig,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    pub(crate) fn base_url(&self) -> Option<&str> {
        self.base_url.as_deref()
    }

    pub(crate) fn default_headers(&self) -> &HeaderMap {
        &self.default_headers
    }

    pub(crate) fn cookies(&self) -> &CookieJar {
        &self.cookies
    }

    pub(crate) fn codecs(&self) -> &CodecRegistry {
        &self.codecs
    }

    pub(crate) fn upload_config(&self) -> UploadConfig {
        self.upload
    }

    pub fn set_retry_policy(&self, policy: RetryPolicy) {
        *self.retry.write().unwrap() = policy;
    }

    pub fn push_request_middleware(&self, mw: impl RequestMiddleware) {
        self.middleware.write().unwrap().push_request(mw);
    }

    pub fn push_response_middleware(&self, mw: impl ResponseMiddleware) {
        self.middleware.write().unwrap().push_response(mw);
    }

    /// Runs the full execution loop (spec §4.5) for a single request.
    pub async fn execute(&self, req: ClientRequest) -> Result<ClientResponse, Error> {
        // Snapshot the middleware list under the read lock, then release it —
        // concurrent `push_*` calls must not block or be blocked by this.
        let middleware = self.middleware.read().unwrap().clone();

        let req = middleware.run_request(req).await?;
        let use_cache = req.cache.as_ref().is_some_and(|c| c.enabled) && req.method == http::Method::GET;
        let resolved = req.resolve(self).await?;

        if use_cache {
            if let Some(cache) = &self.cache {
                if let Some(key) = &resolved.cache_key {
                    if let Some(hit) = cache::lookup(cache, key, Duration::ZERO).await {
                        tracing::debug!(url = %resolved.url, "client: cache hit");
                        return Ok(hit);
                    }
                }
            }
        }

        let retry = self.retry.read().unwrap().clone();
        let started = Instant::now();
        let mut attempt: u32 = 0;

        let response = loop {
            if resolved.cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            tracing::debug!(method = %resolved.method, url = %resolved.url, attempt, "client: attempt");
            let span = tracing::info_span!("client_attempt", method = %resolved.method, url = %resolved.url, attempt);
            let _guard = span.enter();

            let outcome = tokio::select! {
                biased;
                () = resolved.cancel.cancelled() => Err(Error::Cancelled),
                result = self.send_once(&resolved) => result,
            };
            drop(_guard);

            if let Err(Error::Cancelled) = outcome {
                return outcome;
            }

            let elapsed = started.elapsed();
            match outcome {
                Ok(resp) => {
                    if !retry.should_retry(Some(&resp), None, attempt, elapsed) {
                        break resp;
                    }
                    tracing::warn!(attempt, status = %resp.status(), "client: retrying after response");
                }
                Err(err) => {
                    if !retry.should_retry(None, Some(&err), attempt, elapsed) {
                        return Err(err);
                    }
                    tracing::warn!(attempt, error = %err, "client: retrying after error");
                }
            }

            let delay = (retry.backoff)(attempt);
            tokio::select! {
                biased;
                () = resolved.cancel.cancelled() => return Err(Error::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        };

        self.cookies.store_from_headers(response.headers());
        let response = middleware.run_response(response).await?;

        if use_cache {
            if let (Some(cache), Some(key), Some(ttl)) = (&self.cache, &resolved.cache_key, resolved.cache_ttl) {
                cache::store(cache, key.clone(), &response, ttl).await;
            }
        }

        Ok(response)
    }

    /// A single transport round trip, following redirects per
    /// [`RedirectPolicy`]. Does not itself retry — that's the caller's job.
    async fn send_once(&self, resolved: &request::Resolved) -> Result<ClientResponse, Error> {
        let mut url = resolved.url.clone();
        let mut method = resolved.method.clone();
        let mut headers = resolved.headers.clone();
        let mut body = clone_transport_body(&resolved.body);
        let mut hops = 0;

        loop {
            let transport_req = TransportRequest { method: method.clone(), url: url.clone(), headers: headers.clone(), body };
            let started = Instant::now();
            let raw = self.transport.call(transport_req).await?;
            let duration = started.elapsed();

            let resp = ClientResponse {
                status: raw.status,
                headers: raw.headers,
                body: raw.body,
                duration,
                proto: raw.proto,
                request: crate::client::response::RequestBackref { method: method.clone(), url: url.clone() },
            };

            if !self.redirect.follow || !redirect::is_redirect(resp.status) || hops >= self.redirect.max_hops {
                return Ok(resp);
            }
            let Some(location) = redirect::location(&resp) else { return Ok(resp) };
            if !self.redirect.permits(&resp) {
                return Ok(resp);
            }

            url = url.join(&location).map_err(|e| Error::InvalidUrl(e.to_string()))?;
            if resp.status == http::StatusCode::SEE_OTHER {
                method = http::Method::GET;
                body = TransportBody::Empty;
            } else {
                body = clone_transport_body(&resolved.body);
            }
            headers.remove(http::header::CONTENT_LENGTH);
            hops += 1;
        }
    }
}

fn clone_transport_body(body: &TransportBody) -> TransportBody {
    match body {
        TransportBody::Empty => TransportBody::Empty,
        TransportBody::Bytes(b) => TransportBody::Bytes(b.clone()),
        // A stream can only be read once; a redirect hop that needs to
        // resend a streamed body degrades to an empty one rather than
        // buffering it (which is exactly what streaming was chosen to avoid).
        TransportBody::Stream(..) => TransportBody::Empty,
    }
}

pub struct ClientBuilder {
    base_url: Option<String>,
    default_headers: HeaderMap,
    retry: RetryPolicy,
    redirect: RedirectPolicy,
    cache: Option<Arc<dyn Cache>>,
    codecs: CodecRegistry,
    transport: Option<Arc<dyn Transport>>,
    upload: UploadConfig,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self {
            base_url: None,
            default_headers: HeaderMap::new(),
            retry: RetryPolicy::default(),
            redirect: RedirectPolicy::default(),
            cache: None,
            codecs: CodecRegistry::with_defaults(),
            transport: None,
            upload: UploadConfig::default(),
        }
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn default_header(mut self, name: http::HeaderName, value: http::HeaderValue) -> Self {
        self.default_headers.insert(name, value);
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.redirect = policy;
        self
    }

    pub fn cache(mut self, cache: impl Cache) -> Self {
        self.cache = Some(Arc::new(cache));
        self
    }

    pub fn transport(mut self, transport: impl Transport) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Like [`transport`](Self::transport), but takes an already-shared
    /// transport — useful when the caller keeps its own handle to the same
    /// instance (a test's call counter, a connection-pool metrics sink).
    pub fn transport_arc(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn upload_config(mut self, upload: UploadConfig) -> Self {
        self.upload = upload;
        self
    }

    pub fn build(self) -> Client {
        Client {
            base_url: self.base_url,
            default_headers: self.default_headers,
            cookies: CookieJar::new(),
            retry: RwLock::new(self.retry),
            redirect: self.redirect,
            middleware: RwLock::new(MiddlewareStack::new()),
            cache: self.cache,
            codecs: self.codecs,
            transport: self.transport.unwrap_or_else(|| Arc::new(HyperTransport::new())),
            upload: self.upload,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

static DEFAULT_CLIENT: OnceLock<Client> = OnceLock::new();

/// The process-wide convenience client (spec §9: keep the convenience
/// wrapper, back it with ordinary construction rather than global mutable
/// state — built once, on first use).
pub fn default() -> &'static Client {
    DEFAULT_CLIENT.get_or_init(|| Client::builder().build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::cache::InMemoryCache;
    use crate::client::transport::TransportResponse;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;
    use std::pin::Pin;

    /// Returns a fixed sequence of statuses, one per call, repeating the
    /// last once exhausted. Counts every call it receives.
    struct ScriptedTransport {
        statuses: Vec<u16>,
        calls: AtomicUsize,
    }

    impl ScriptedTransport {
        fn new(statuses: Vec<u16>) -> Self {
            Self { statuses, calls: AtomicUsize::new(0) }
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Transport for ScriptedTransport {
        fn call(&self, _req: TransportRequest) -> BoxFuture<'static, Result<TransportResponse, Error>> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            let status = *self.statuses.get(idx).unwrap_or_else(|| self.statuses.last().unwrap());
            Box::pin(async move {
                Ok(TransportResponse {
                    status: StatusCode::from_u16(status).unwrap(),
                    headers: HeaderMap::new(),
                    body: Bytes::from_static(b"ok"),
                    proto: "mock",
                })
            })
        }
    }

    use bytes::Bytes;
    use http::StatusCode;

    #[tokio::test]
    async fn retries_until_success_running_each_middleware_once() {
        let transport = Arc::new(ScriptedTransport::new(vec![500, 500, 200]));
        let request_hits = Arc::new(AtomicUsize::new(0));
        let response_hits = Arc::new(AtomicUsize::new(0));

        let client = Client::builder()
            .transport_arc(transport.clone())
            .retry_policy(RetryPolicy::builder().max_retries(3).backoff(|_| Duration::ZERO).build())
            .build();

        {
            let counter = request_hits.clone();
            client.push_request_middleware(move |req: ClientRequest| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(req)
                }) as BoxFuture<'static, Result<ClientRequest, Error>>
            });
        }
        {
            let counter = response_hits.clone();
            client.push_response_middleware(move |resp: ClientResponse| {
                let counter = counter.clone();
                Box::pin(async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(resp)
                }) as BoxFuture<'static, Result<ClientResponse, Error>>
            });
        }

        let resp = client.execute(ClientRequest::get("https://example.com/x")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(transport.call_count(), 3);
        assert_eq!(request_hits.load(Ordering::SeqCst), 1);
        assert_eq!(response_hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn second_cached_get_does_not_reach_the_transport() {
        let transport = Arc::new(ScriptedTransport::new(vec![200]));
        let client = Client::builder()
            .transport_arc(transport.clone())
            .cache(InMemoryCache::new())
            .build();

        let make_req = || ClientRequest::get("https://example.com/x").use_cache(Duration::from_secs(60));

        let first = client.execute(make_req()).await.unwrap();
        let second = client.execute(make_req()).await.unwrap();

        assert_eq!(transport.call_count(), 1);
        assert_eq!(first.body(), second.body());
    }

    #[tokio::test]
    async fn exhausting_retries_surfaces_the_last_response() {
        let transport = Arc::new(ScriptedTransport::new(vec![500, 500, 500]));
        let client = Client::builder()
            .transport_arc(transport.clone())
            .retry_policy(RetryPolicy::builder().max_retries(2).backoff(|_| Duration::ZERO).build())
            .build();

        let resp = client.execute(ClientRequest::get("https://example.com/x")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(transport.call_count(), 3);
    }

    #[tokio::test]
    async fn request_middleware_abort_is_terminal() {
        let transport = Arc::new(ScriptedTransport::new(vec![200]));
        let client = Client::builder().transport_arc(transport.clone()).build();

        client.push_request_middleware(move |_req: ClientRequest| {
            Box::pin(async move { Err(Error::InvalidDataFormat("rejected by middleware")) })
                as BoxFuture<'static, Result<ClientRequest, Error>>
        });

        let err = client.execute(ClientRequest::get("https://example.com/x")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidDataFormat(_)));
        assert_eq!(transport.call_count(), 0);
    }
}
