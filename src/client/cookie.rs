//! A minimal cookie jar: auto-attaches previously stored cookies to
//! requests, and records `Set-Cookie` headers from responses.
//!
//! Deliberately simplified relative to full RFC 6265 — no domain/path
//! matching, just a name/value store with optional expiry parsed from
//! `Max-Age`/`Expires`. Noted in DESIGN.md as an accepted simplification:
//! the spec only requires "auto-attached, server-set cookies stored".

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

/// Guarded by its own mutex, separate from the client's header/middleware
/// lock, per the spec's concurrency model (§5).
pub struct CookieJar {
    entries: Mutex<HashMap<String, Entry>>,
}

impl CookieJar {
    pub fn new() -> Self {
        Self { entries: Mutex::new(HashMap::new()) }
    }

    /// A cloned, expiry-filtered snapshot of every live cookie — callers
    /// never hold the lock while building a request.
    pub fn snapshot_for(&self, _url: &url::Url) -> Vec<(String, String)> {
        let now = Instant::now();
        let mut guard = self.entries.lock().unwrap();
        guard.retain(|_, e| e.expires_at.is_none_or(|exp| exp > now));
        guard.iter().map(|(k, e)| (k.clone(), e.value.clone())).collect()
    }

    pub fn set(&self, name: String, value: String, max_age: Option<Duration>) {
        let expires_at = max_age.map(|d| Instant::now() + d);
        self.entries.lock().unwrap().insert(name, Entry { value, expires_at });
    }

    /// Parses and stores every `Set-Cookie` header on a response.
    pub fn store_from_headers(&self, headers: &http::HeaderMap) {
        for value in headers.get_all(http::header::SET_COOKIE) {
            if let Ok(s) = value.to_str() {
                if let Some((name, value, max_age)) = parse_set_cookie(s) {
                    self.set(name, value, max_age);
                }
            }
        }
    }
}

impl Default for CookieJar {
    fn default() -> Self {
        Self::new()
    }
}

/// Parses just enough of a `Set-Cookie` header to extract name, value, and
/// an optional `Max-Age` (in seconds) — no `Expires` date parsing, no
/// domain/path/secure/httponly attributes.
fn parse_set_cookie(raw: &str) -> Option<(String, String, Option<Duration>)> {
    let mut parts = raw.split(';');
    let (name, value) = parts.next()?.split_once('=')?;
    let name = name.trim().to_string();
    let value = value.trim().to_string();
    if name.is_empty() {
        return None;
    }

    let max_age = parts.find_map(|attr| {
        let attr = attr.trim();
        let rest = attr.strip_prefix("Max-Age=").or_else(|| attr.strip_prefix("max-age="))?;
        rest.parse::<i64>().ok().filter(|s| *s >= 0).map(|s| Duration::from_secs(s as u64))
    });

    Some((name, value, max_age))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stores_and_snapshots_a_plain_cookie() {
        let jar = CookieJar::new();
        jar.set("session".into(), "abc123".into(), None);
        let url = url::Url::parse("https://example.com").unwrap();
        let snap = jar.snapshot_for(&url);
        assert_eq!(snap, vec![("session".to_string(), "abc123".to_string())]);
    }

    #[test]
    fn parses_set_cookie_with_max_age() {
        let (name, value, max_age) = parse_set_cookie("id=42; Max-Age=3600; Path=/").unwrap();
        assert_eq!(name, "id");
        assert_eq!(value, "42");
        assert_eq!(max_age, Some(Duration::from_secs(3600)));
    }

    #[test]
    fn expired_cookie_is_pruned_from_snapshot() {
        let jar = CookieJar::new();
        jar.set("s".into(), "v".into(), Some(Duration::from_millis(1)));
        std::thread::sleep(Duration::from_millis(20));
        let url = url::Url::parse("https://example.com").unwrap();
        assert!(jar.snapshot_for(&url).is_empty());
    }

    #[test]
    fn store_from_headers_parses_multiple_set_cookie_lines() {
        let jar = CookieJar::new();
        let mut headers = http::HeaderMap::new();
        headers.append(http::header::SET_COOKIE, http::HeaderValue::from_static("a=1"));
        headers.append(http::header::SET_COOKIE, http::HeaderValue::from_static("b=2"));
        jar.store_from_headers(&headers);
        let url = url::Url::parse("https://example.com").unwrap();
        let mut snap = jar.snapshot_for(&url);
        snap.sort();
        assert_eq!(snap, vec![("a".to_string(), "1".to_string()), ("b".to_string(), "2".to_string())]);
    }
}
