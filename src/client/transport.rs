//! The pluggable transport seam: everything the client core needs from an
//! actual network call, abstracted behind one trait so tests (and
//! alternative stacks — HTTP/3, a mock, a recorded fixture) can swap in a
//! different implementation without touching the execution loop.
//!
//! The default implementation delegates the wire protocol entirely to
//! `hyper-util`'s legacy client, matching the server side's delegation to
//! `hyper`'s `auto::Builder` in [`crate::server`] — this crate does not
//! parse HTTP/1.1 or HTTP/2 itself anywhere, per the spec's non-goals.

use std::future::Future;
use std::pin::Pin;
use std::sync::OnceLock;
use std::task::{Context as TaskContext, Poll};
use std::time::Instant;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::body::Frame;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::TokioExecutor;
use tokio::io::{AsyncRead, ReadBuf};

use crate::bufpool::BufferPool;
use crate::client::response::ClientResponse;
use crate::error::Error;

/// The scratch-buffer pool backing [`ReaderBody`]'s chunked reads. One pool
/// per process, shared across every streamed upload, the same way the
/// default client is a single process-wide instance (spec §9).
fn read_buffer_pool() -> &'static BufferPool {
    static POOL: OnceLock<BufferPool> = OnceLock::new();
    POOL.get_or_init(BufferPool::with_default_tiers)
}

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A resolved, ready-to-send body.
pub enum TransportBody {
    Empty,
    Bytes(Bytes),
    /// Not buffered ahead of time — used when the client's upload config
    /// asks for streaming above `LargeFileThreshold` (spec §6).
    Stream(Pin<Box<dyn AsyncRead + Send>>, usize),
}

pub struct TransportRequest {
    pub method: http::Method,
    pub url: url::Url,
    pub headers: HeaderMap,
    pub body: TransportBody,
}

pub struct TransportResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub proto: &'static str,
}

/// The transport seam. `call` takes ownership of the request and returns
/// either a fully-read response or an opaque, retry-eligible error.
pub trait Transport: Send + Sync + 'static {
    fn call(&self, req: TransportRequest) -> BoxFuture<'static, Result<TransportResponse, Error>>;
}

/// `hyper_util::client::legacy::Client` wired up with a plain `HttpConnector`
/// — no TLS (pass-through to an external collaborator per spec §1).
pub struct HyperTransport {
    inner: HyperClient<HttpConnector, OutgoingBody>,
}

impl HyperTransport {
    pub fn new() -> Self {
        Self { inner: HyperClient::builder(TokioExecutor::new()).build(HttpConnector::new()) }
    }
}

impl Default for HyperTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for HyperTransport {
    fn call(&self, req: TransportRequest) -> BoxFuture<'static, Result<TransportResponse, Error>> {
        let inner = self.inner.clone();
        Box::pin(async move {
            let uri: http::Uri = req.url.as_str().parse().map_err(|e: http::uri::InvalidUri| Error::InvalidUrl(e.to_string()))?;

            let mut builder = http::Request::builder().method(req.method).uri(uri);
            *builder.headers_mut().expect("request builder has no error yet") = req.headers;

            let body = match req.body {
                TransportBody::Empty => OutgoingBody::Full(Full::new(Bytes::new())),
                TransportBody::Bytes(b) => OutgoingBody::Full(Full::new(b)),
                TransportBody::Stream(reader, chunk_size) => OutgoingBody::Stream(ReaderBody::new(reader, chunk_size)),
            };

            let request = builder
                .body(body)
                .map_err(|e| Error::InvalidUrl(format!("malformed request: {e}")))?;

            let started = Instant::now();
            let response = inner
                .request(request)
                .await
                .map_err(|e| Error::Transport(std::sync::Arc::new(e)))?;

            let proto = match response.version() {
                http::Version::HTTP_2 => "HTTP/2",
                http::Version::HTTP_10 => "HTTP/1.0",
                _ => "HTTP/1.1",
            };
            let status = response.status();
            let headers = response.headers().clone();
            let collected = response
                .into_body()
                .collect()
                .await
                .map_err(|e| Error::Transport(std::sync::Arc::new(e)))?;

            let _ = started;
            Ok(TransportResponse { status, headers, body: collected.to_bytes(), proto })
        })
    }
}

/// A `hyper::body::Body` that is either a fully-buffered [`Full`] or a
/// chunked reader over an `AsyncRead` source, used for streaming uploads.
enum OutgoingBody {
    Full(Full<Bytes>),
    Stream(ReaderBody),
}

impl hyper::body::Body for OutgoingBody {
    type Data = Bytes;
    type Error = std::io::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut TaskContext<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            OutgoingBody::Full(full) => Pin::new(full).poll_frame(cx).map_err(|never| match never {}),
            OutgoingBody::Stream(stream) => Pin::new(stream).poll_frame(cx),
        }
    }
}

/// Wraps an `AsyncRead` source as a `hyper::body::Body`, reading
/// `chunk_size`-sized frames on demand instead of buffering the whole body
/// up front.
struct ReaderBody {
    reader: Pin<Box<dyn AsyncRead + Send>>,
    chunk_size: usize,
}

impl ReaderBody {
    fn new(reader: Pin<Box<dyn AsyncRead + Send>>, chunk_size: usize) -> Self {
        Self { reader, chunk_size: chunk_size.max(1) }
    }
}

impl hyper::body::Body for ReaderBody {
    type Data = Bytes;
    type Error = std::io::Error;

    /// Borrows a scratch buffer from the process-wide [`BufferPool`] for the
    /// read, copies only the bytes actually filled into the outgoing frame,
    /// and returns the scratch buffer to its tier before returning — a
    /// streamed upload that sits mostly in `Poll::Pending` never pins a
    /// chunk-sized allocation down between polls.
    fn poll_frame(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let pool = read_buffer_pool();
        let mut scratch = pool.acquire(this.chunk_size);
        scratch.resize(this.chunk_size, 0);

        let mut read_buf = ReadBuf::new(&mut scratch);
        let poll = this.reader.as_mut().poll_read(cx, &mut read_buf);
        let filled = read_buf.filled().len();

        let result = match poll {
            Poll::Ready(Ok(())) if filled == 0 => Poll::Ready(None),
            Poll::Ready(Ok(())) => Poll::Ready(Some(Ok(Frame::data(Bytes::copy_from_slice(&scratch[..filled]))))),
            Poll::Ready(Err(e)) => Poll::Ready(Some(Err(e))),
            Poll::Pending => Poll::Pending,
        };
        scratch.clear();
        pool.release(scratch);
        result
    }
}
