//! Client-side middleware: hooks that run before a request is sent and
//! after a response comes back. Distinct from [`crate::middleware`]
//! (server-side), which works by threading [`crate::context::Context`]
//! through a chain instead — the client has no per-handler chain to
//! thread, just two ordered lists the execution loop consults (spec §4.5
//! steps 1 and 4).

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::client::request::ClientRequest;
use crate::client::response::ClientResponse;
use crate::error::Error;

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Runs before a request is sent. May mutate the request in place or abort
/// the whole execution with an error.
pub trait RequestMiddleware: Send + Sync + 'static {
    fn handle(&self, req: ClientRequest) -> BoxFuture<'_, Result<ClientRequest, Error>>;
}

/// Runs after a successful transport attempt (including cache hits — spec
/// leaves this implementation-defined; `corehttp` only runs response
/// middleware on a fresh network result, matching "cache stores happen
/// after response middleware" in §5, which implies middleware doesn't
/// re-run on a hit that bypassed the network).
pub trait ResponseMiddleware: Send + Sync + 'static {
    fn handle(&self, resp: ClientResponse) -> BoxFuture<'_, Result<ClientResponse, Error>>;
}

impl<F> RequestMiddleware for F
where
    F: Fn(ClientRequest) -> BoxFuture<'static, Result<ClientRequest, Error>> + Send + Sync + 'static,
{
    fn handle(&self, req: ClientRequest) -> BoxFuture<'_, Result<ClientRequest, Error>> {
        self(req)
    }
}

impl<F> ResponseMiddleware for F
where
    F: Fn(ClientResponse) -> BoxFuture<'static, Result<ClientResponse, Error>> + Send + Sync + 'static,
{
    fn handle(&self, resp: ClientResponse) -> BoxFuture<'_, Result<ClientResponse, Error>> {
        self(resp)
    }
}

/// Snapshot-copied before iteration (spec §5: "readers snapshot-copy under
/// read lock before iteration to allow concurrent mutation").
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    pub(crate) request: Vec<Arc<dyn RequestMiddleware>>,
    pub(crate) response: Vec<Arc<dyn ResponseMiddleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_request(&mut self, mw: impl RequestMiddleware) {
        self.request.push(Arc::new(mw));
    }

    pub fn push_response(&mut self, mw: impl ResponseMiddleware) {
        self.response.push(Arc::new(mw));
    }

    pub(crate) async fn run_request(&self, mut req: ClientRequest) -> Result<ClientRequest, Error> {
        for mw in self.request.clone() {
            req = mw.handle(req).await?;
        }
        Ok(req)
    }

    pub(crate) async fn run_response(&self, mut resp: ClientResponse) -> Result<ClientResponse, Error> {
        for mw in self.response.clone() {
            resp = mw.handle(resp).await?;
        }
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::{HeaderMap, Method, StatusCode};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn sample_response() -> ClientResponse {
        ClientResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: bytes::Bytes::new(),
            duration: Duration::from_millis(1),
            proto: "HTTP/1.1",
            request: crate::client::response::RequestBackref {
                method: Method::GET,
                url: url::Url::parse("https://example.com/x").unwrap(),
            },
        }
    }

    #[tokio::test]
    async fn request_middleware_runs_in_registration_order() {
        let mut stack = MiddlewareStack::new();
        stack.push_request(|req: ClientRequest| -> BoxFuture<'static, Result<ClientRequest, Error>> {
            Box::pin(async move {
                let mut req = req;
                req.headers.insert("x-order", http::HeaderValue::from_static("1"));
                Ok(req)
            })
        });
        stack.push_request(|req: ClientRequest| -> BoxFuture<'static, Result<ClientRequest, Error>> {
            Box::pin(async move {
                let mut req = req;
                req.headers.insert("x-order", http::HeaderValue::from_static("2"));
                Ok(req)
            })
        });

        let req = ClientRequest::new(Method::GET, "/x");
        let done = stack.run_request(req).await.unwrap();
        assert_eq!(done.headers.get("x-order").unwrap(), "2");
    }

    #[tokio::test]
    async fn a_request_middleware_error_aborts_the_remaining_chain() {
        static RAN: AtomicUsize = AtomicUsize::new(0);

        let mut stack = MiddlewareStack::new();
        stack.push_request(|_req: ClientRequest| -> BoxFuture<'static, Result<ClientRequest, Error>> {
            Box::pin(async move { Err(Error::Cancelled) })
        });
        stack.push_request(|req: ClientRequest| -> BoxFuture<'static, Result<ClientRequest, Error>> {
            RAN.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move { Ok(req) })
        });

        let req = ClientRequest::new(Method::GET, "/x");
        let result = stack.run_request(req).await;
        assert!(result.is_err());
        assert_eq!(RAN.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn response_middleware_can_replace_the_response() {
        let mut stack = MiddlewareStack::new();
        stack.push_response(|resp: ClientResponse| -> BoxFuture<'static, Result<ClientResponse, Error>> {
            Box::pin(async move {
                let mut resp = resp;
                resp.status = StatusCode::IM_A_TEAPOT;
                Ok(resp)
            })
        });

        let done = stack.run_response(sample_response()).await.unwrap();
        assert_eq!(done.status(), StatusCode::IM_A_TEAPOT);
    }

    #[tokio::test]
    async fn empty_stack_passes_requests_and_responses_through_unchanged() {
        let stack = MiddlewareStack::new();
        let req = ClientRequest::new(Method::GET, "/x");
        let done = stack.run_request(req).await.unwrap();
        assert_eq!(done.target, "/x");

        let done = stack.run_response(sample_response()).await.unwrap();
        assert_eq!(done.status(), StatusCode::OK);
    }
}
