//! Pluggable response cache: `GET` responses are stored as a self-describing
//! envelope `{status, headers, body}` (spec §6) so a hit can be decoded
//! without knowing the original content type.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{HeaderMap, StatusCode};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;

use crate::client::response::{ClientResponse, RequestBackref};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// On-wire cache envelope. `headers` is a plain multimap so it round-trips
/// through `serde_json` without pulling `http::HeaderMap` serde support in.
#[derive(Serialize, Deserialize)]
struct Envelope {
    status: u16,
    headers: HashMap<String, Vec<String>>,
    body: Vec<u8>,
    method: String,
    url: String,
}

impl Envelope {
    fn from_response(resp: &ClientResponse) -> Self {
        let mut headers: HashMap<String, Vec<String>> = HashMap::new();
        for (name, value) in resp.headers() {
            if let Ok(v) = value.to_str() {
                headers.entry(name.as_str().to_string()).or_default().push(v.to_string());
            }
        }
        Self {
            status: resp.status().as_u16(),
            headers,
            body: resp.body().to_vec(),
            method: resp.request().method().to_string(),
            url: resp.request().url().to_string(),
        }
    }

    fn into_response(self, duration: Duration) -> Option<ClientResponse> {
        let mut headers = HeaderMap::new();
        for (name, values) in self.headers {
            let Ok(name) = http::HeaderName::from_bytes(name.as_bytes()) else { continue };
            for v in values {
                if let Ok(value) = http::HeaderValue::from_str(&v) {
                    headers.append(name.clone(), value);
                }
            }
        }
        let method = self.method.parse().ok()?;
        let url = url::Url::parse(&self.url).ok()?;
        Some(ClientResponse {
            status: StatusCode::from_u16(self.status).unwrap_or(StatusCode::OK),
            headers,
            body: Bytes::from(self.body),
            duration,
            proto: "cache",
            request: RequestBackref { method, url },
        })
    }
}

/// A pluggable get/set-by-key cache with TTL. The default implementation is
/// in-process; a collaborator (Redis, memcached, ...) can be swapped in by
/// implementing this trait.
pub trait Cache: Send + Sync + 'static {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<Bytes>>;
    fn set(&self, key: String, value: Bytes, ttl: Duration) -> BoxFuture<'_, ()>;
}

struct CacheEntry {
    value: Bytes,
    expires_at: Instant,
}

/// An in-memory cache guarded by a single async mutex — adequate for the
/// core's default, not meant to scale to a shared multi-process cache.
pub struct InMemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl Cache for InMemoryCache {
    fn get(&self, key: &str) -> BoxFuture<'_, Option<Bytes>> {
        let key = key.to_string();
        Box::pin(async move {
            let mut guard = self.entries.lock().await;
            match guard.get(&key) {
                Some(entry) if entry.expires_at > Instant::now() => Some(entry.value.clone()),
                Some(_) => {
                    guard.remove(&key);
                    None
                }
                None => None,
            }
        })
    }

    fn set(&self, key: String, value: Bytes, ttl: Duration) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.entries.lock().await.insert(key, CacheEntry { value, expires_at: Instant::now() + ttl });
        })
    }
}

/// Encodes a response into the envelope format and stores it under `key`.
pub(crate) async fn store(cache: &Arc<dyn Cache>, key: String, resp: &ClientResponse, ttl: Duration) {
    let Ok(bytes) = serde_json::to_vec(&Envelope::from_response(resp)) else { return };
    cache.set(key, Bytes::from(bytes), ttl).await;
}

/// Looks up `key` and, on a hit, decodes it back into a response. `duration`
/// is recorded as the (near-zero) time the cache lookup itself took.
pub(crate) async fn lookup(cache: &Arc<dyn Cache>, key: &str, duration: Duration) -> Option<ClientResponse> {
    let bytes = cache.get(key).await?;
    let envelope: Envelope = serde_json::from_slice(&bytes).ok()?;
    envelope.into_response(duration)
}
