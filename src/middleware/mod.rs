//! Built-in server-side middleware.
//!
//! There is no separate `Middleware` trait here: a middleware is just a
//! [`crate::Handler`] that calls [`crate::Context::next`] between its
//! pre- and post-processing, the same chain-of-responsibility shape every
//! route handler already uses (see [`crate::handler`] and
//! [`crate::context`] for why `Context` moves by value rather than being
//! borrowed). `Router::group(..).use_middleware(..)` accepts any of these.
//!
//! This module ships the couple of cross-cutting handlers most services end
//! up writing by hand: request logging and a request-id tag. Anything more
//! specific (auth, CORS) is expected to live in application code, built the
//! same way these are.

use tracing::{info, info_span};

use crate::context::Context;

/// Logs method, path, resulting status, and elapsed time at `info` once the
/// rest of the chain has returned. Register it first in a group so it wraps
/// everything downstream, including another middleware's own failures.
///
/// ```rust,no_run
/// use corehttp::{Router, middleware};
///
/// let app = Router::new();
/// let api = app.group("/api").use_middleware(middleware::logging);
/// ```
pub async fn logging(ctx: Context) -> Context {
    let method = ctx.request.method().clone();
    let path = ctx.request.path().to_string();
    let span = info_span!("request", %method, %path);
    let _guard = span.enter();

    let started = std::time::Instant::now();
    let ctx = ctx.next().await;
    let elapsed = started.elapsed();

    info!(%method, %path, status = %ctx.response.status_code(), elapsed_ms = elapsed.as_millis() as u64, "request handled");
    ctx
}

/// Tags the context with a fresh request id (a monotonic counter rather
/// than a UUID dependency, matching the rest of the corpus's preference for
/// the smallest crate that does the job) under the key `"request_id"`,
/// readable downstream with `ctx.get::<u64>("request_id")`.
pub async fn request_id(mut ctx: Context) -> Context {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT: AtomicU64 = AtomicU64::new(1);
    let id = NEXT.fetch_add(1, Ordering::Relaxed);
    ctx.set("request_id", id);
    ctx.next().await
}
