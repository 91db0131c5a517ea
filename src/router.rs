//! Route registration: the public `Router`/`RouterGroup` builder surface
//! over the three-tier [`matcher`] that does the actual matching.

pub mod matcher;
pub mod pattern;
pub mod radix;

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::{HeaderMap, Method};

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::ResponseWriter;
use crate::router::matcher::Matcher;

/// The routing table for a server: one [`Matcher`] shared (via `Arc`)
/// between the `Router` handle the application builds routes on and the
/// handle [`crate::server::Server`] keeps for dispatch.
#[derive(Clone)]
pub struct Router {
    matcher: Arc<Matcher>,
}

impl Router {
    pub fn new() -> Self {
        Self { matcher: Arc::new(Matcher::new()) }
    }

    pub(crate) fn matcher(&self) -> &Arc<Matcher> {
        &self.matcher
    }

    /// A sub-group rooted at `base_path`, sharing this router's matcher.
    /// Registrations on the group prepend `base_path` to the pattern and
    /// the group's middleware to the handler chain.
    pub fn group(&self, base_path: impl Into<String>) -> RouterGroup {
        RouterGroup { matcher: Arc::clone(&self.matcher), base_path: normalize_base(&base_path.into()), middleware: Vec::new() }
    }

    pub fn route(&self, method: Method, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.matcher.register(method, pattern, vec![handler.into_boxed_handler()])
    }

    pub fn get(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn delete(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::DELETE, pattern, handler)
    }

    pub fn patch(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::PATCH, pattern, handler)
    }

    /// Unregisters a previously-registered route, returning whether a route
    /// actually matched `(method, pattern)`. `pattern` must be the exact
    /// registration pattern (e.g. `/users/:id`, not a concrete path) — this
    /// mirrors the exact-pattern match `register` itself requires for the
    /// duplicate check in spec §4.1.
    pub fn remove(&self, method: Method, pattern: &str) -> Result<bool, Error> {
        self.matcher.remove(&method, pattern)
    }

    /// Looks up and runs the handler chain for `(method, target)` without
    /// going through a socket — the same match-then-run core
    /// [`crate::server::Server`] drives per connection, exposed here so an
    /// application (or this crate's own integration tests) can exercise a
    /// route in-process. Returns `None` on a routing miss; the caller
    /// decides how that becomes a response (the server answers 404).
    ///
    /// Unlike [`crate::server::Server::serve`], this does not isolate a
    /// panicking handler in its own task — a handler panic unwinds into the
    /// caller, which is the right tradeoff for a test harness that wants to
    /// see the panic, not swallow it as a 500.
    pub async fn dispatch(
        &self,
        method: Method,
        target: &str,
        headers: HeaderMap,
        body: Bytes,
        remote_addr: Option<SocketAddr>,
    ) -> Option<ResponseWriter> {
        let (matched, raw_query) = self.matcher.lookup(&method, target)?;
        let path = target.split(['?', '#']).next().unwrap_or(target).to_string();
        let request = Request::new(method, path, raw_query.map(str::to_string), headers, body, matched.params, remote_addr);
        let chain = Arc::new(matched.route.chain.clone());
        let ctx = Context::new(request, chain, None);
        Some(ctx.dispatch().await.response)
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// A base path and a middleware chain, composed onto every route
/// registered through it. Nesting via [`RouterGroup::group`] concatenates
/// both the path and the middleware of the parent with the child's.
pub struct RouterGroup {
    matcher: Arc<Matcher>,
    base_path: String,
    middleware: Vec<BoxedHandler>,
}

impl RouterGroup {
    /// Appends a middleware handler to this group's chain. Order is
    /// preserved: middleware registered first runs first, and runs before
    /// any route handler registered through this group.
    pub fn use_middleware(mut self, handler: impl Handler) -> Self {
        self.middleware.push(handler.into_boxed_handler());
        self
    }

    /// A nested group: `base_path` is appended to this group's, and this
    /// group's middleware runs before the nested group's own.
    pub fn group(&self, base_path: impl Into<String>) -> RouterGroup {
        RouterGroup {
            matcher: Arc::clone(&self.matcher),
            base_path: format!("{}{}", self.base_path, normalize_base(&base_path.into())),
            middleware: self.middleware.clone(),
        }
    }

    pub fn route(&self, method: Method, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        let full_pattern = join_pattern(&self.base_path, pattern);
        let mut chain = self.middleware.clone();
        chain.push(handler.into_boxed_handler());
        self.matcher.register(method, &full_pattern, chain)
    }

    pub fn get(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::GET, pattern, handler)
    }

    pub fn post(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::POST, pattern, handler)
    }

    pub fn put(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::PUT, pattern, handler)
    }

    pub fn delete(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::DELETE, pattern, handler)
    }

    pub fn patch(&self, pattern: &str, handler: impl Handler) -> Result<(), Error> {
        self.route(Method::PATCH, pattern, handler)
    }
}

fn normalize_base(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn join_pattern(base: &str, pattern: &str) -> String {
    if pattern.starts_with('/') {
        format!("{base}{pattern}")
    } else {
        format!("{base}/{pattern}")
    }
}
