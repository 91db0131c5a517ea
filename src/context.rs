//! Per-request execution context: the value threaded through a route's
//! handler chain.
//!
//! # Why `Context` moves instead of being borrowed
//!
//! A naive chain-of-responsibility design hands each handler `&mut
//! Context` and lets it recurse into the next one. In async Rust that
//! borrow has to live across every `.await` point in the rest of the
//! chain, which pins the handler's `Future` type to the lifetime of that
//! one borrow — exactly the shape of future that cannot be named in a
//! `dyn Handler` trait object's associated type.
//!
//! `Context` sidesteps this by being **owned and threaded by value**, the
//! same shape the handler chain already uses everywhere else in this
//! crate (compare [`crate::handler::Handler`], which is the generic
//! version of this same `Fn(Request) -> Fut` pattern from the original
//! single-handler design, just carrying `Context` all the way through
//! instead of stopping at one call). `ctx.next().await` consumes `self`
//! and returns the (possibly further-mutated) `Context` once the
//! downstream handlers have run; a handler that wants to stop the chain
//! either doesn't call `next()` or calls [`Context::abort`] first.
//!
//! Because the chain index only ever moves forward across these owned
//! handoffs, a handler cannot be invoked twice for the same request and
//! cannot rewind past itself — that is the whole of this crate's
//! re-entrancy guarantee, with no extra bookkeeping required.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use hyper::upgrade::OnUpgrade;

use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::ResponseWriter;

/// The value every handler in a route's chain receives and returns.
pub struct Context {
    pub request: Request,
    pub response: ResponseWriter,
    chain: Arc<Vec<BoxedHandler>>,
    index: usize,
    aborted: bool,
    store: HashMap<String, Box<dyn Any + Send + Sync>>,
    hijack: Option<OnUpgrade>,
}

impl Context {
    pub(crate) fn new(request: Request, chain: Arc<Vec<BoxedHandler>>, hijack: Option<OnUpgrade>) -> Self {
        Self {
            request,
            response: ResponseWriter::new(),
            chain,
            index: 0,
            aborted: false,
            store: HashMap::new(),
            hijack,
        }
    }

    /// Runs the chain from its first handler. If the chain is empty this
    /// is a no-op and the context is returned with whatever default
    /// response state it started with (a bare `204`).
    pub(crate) async fn dispatch(self) -> Self {
        let Some(first) = self.chain.first().cloned() else {
            return self;
        };
        first.call(self).await
    }

    /// Advances to the next handler in the chain. No-op if the chain was
    /// [`abort`](Context::abort)ed or is already exhausted.
    pub async fn next(mut self) -> Self {
        if self.aborted {
            return self;
        }
        let next_index = self.index + 1;
        self.index = next_index;
        let Some(handler) = self.chain.get(next_index).cloned() else {
            return self;
        };
        handler.call(self).await
    }

    /// Stops the chain: every subsequent `next()` call, including ones
    /// already pending further up the call stack, becomes a no-op.
    pub fn abort(&mut self) {
        self.aborted = true;
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }

    /// Stores an arbitrary value under `key` for the rest of this
    /// request's lifetime — the handoff mechanism for middleware that
    /// computes something downstream handlers need (a request ID, an
    /// authenticated principal, ...).
    pub fn set<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.store.insert(key.into(), Box::new(value));
    }

    pub fn get<T: Any + Send + Sync>(&self, key: &str) -> Option<&T> {
        self.store.get(key)?.downcast_ref::<T>()
    }

    /// Takes ownership of the raw connection upgrade future, handing the
    /// socket to the caller (e.g. a WebSocket implementation sitting on
    /// top of this crate). Returns `None` if the client did not send an
    /// `Upgrade` request, or if this has already been called once.
    pub fn hijack(&mut self) -> Option<OnUpgrade> {
        self.hijack.take()
    }
}
