//! Built-in Kubernetes health-check handlers.
//!
//! Kubernetes asks two questions. corehttp answers them.
//!
//! | Probe | Path | Question |
//! |---|---|---|
//! | **Liveness** | `/healthz` | Is the process alive? Failure → restart. |
//! | **Readiness** | `/readyz` | Can the pod serve traffic? Failure → pulled from load-balancer. |
//!
//! Register them on your router:
//!
//! ```rust,no_run
//! use corehttp::{Router, health};
//!
//! let app = Router::new();
//! app.get("/healthz", health::liveness).unwrap();
//! app.get("/readyz", health::readiness).unwrap();
//! ```
//!
//! Override `readiness` with a custom handler if you need to gate on
//! dependency availability (database connections, downstream services, etc.):
//!
//! ```rust,no_run
//! use corehttp::Context;
//! use http::StatusCode;
//!
//! async fn readiness(mut ctx: Context) -> Context {
//!     if dependencies_are_healthy().await {
//!         ctx.response.text("ready");
//!     } else {
//!         ctx.response.status(StatusCode::SERVICE_UNAVAILABLE).text("not ready");
//!     }
//!     ctx
//! }
//!
//! async fn dependencies_are_healthy() -> bool { true }
//! ```

use crate::context::Context;

/// Kubernetes liveness probe handler.
///
/// Always returns `200 OK` with body `"ok"`. If the process can respond to
/// HTTP at all, it is alive — this handler intentionally has no dependencies.
pub async fn liveness(mut ctx: Context) -> Context {
    ctx.response.text("ok");
    ctx
}

/// Kubernetes readiness probe handler (default implementation).
///
/// Returns `200 OK` with body `"ready"`. Replace this with your own handler
/// if your application needs a warm-up period or must verify dependency health
/// before accepting traffic.
pub async fn readiness(mut ctx: Context) -> Context {
    ctx.response.text("ready");
    ctx
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, Method, StatusCode};

    fn blank_request() -> crate::request::Request {
        crate::request::Request::new(Method::GET, "/".to_string(), None, HeaderMap::new(), Bytes::new(), Vec::new(), None)
    }

    #[tokio::test]
    async fn liveness_returns_200_ok() {
        let ctx = Context::new(blank_request(), std::sync::Arc::new(Vec::new()), None);
        let done = liveness(ctx).await;
        assert_eq!(done.response.status_code(), StatusCode::OK);
        assert_eq!(done.response.body_len(), 2);
    }

    #[tokio::test]
    async fn readiness_returns_200_ok_by_default() {
        let ctx = Context::new(blank_request(), std::sync::Arc::new(Vec::new()), None);
        let done = readiness(ctx).await;
        assert_eq!(done.response.status_code(), StatusCode::OK);
        assert_eq!(done.response.body_len(), 5);
    }
}
