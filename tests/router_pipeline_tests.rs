//! Integration tests for the server-side pipeline: route registration,
//! the three-tier matcher, and the handler chain, driven entirely through
//! `corehttp`'s public API (`Router::dispatch`, no socket involved).
//!
//! Mirrors the seed scenarios in the routing spec: static-vs-parametric
//! precedence, catch-all suffix capture, and nested group middleware.

use bytes::Bytes;
use corehttp::{Context, Router};
use http::{HeaderMap, Method, StatusCode};

async fn get(router: &Router, target: &str) -> Option<http::StatusCode> {
    router
        .dispatch(Method::GET, target, HeaderMap::new(), Bytes::new(), None)
        .await
        .map(|w| w.status_code())
}

#[tokio::test]
async fn static_route_takes_precedence_over_parametric_at_same_depth() {
    let router = Router::new();
    async fn by_id(mut ctx: Context) -> Context {
        let id = ctx.request.param("id").unwrap().to_string();
        ctx.response.text(format!("id={id}"));
        ctx
    }
    async fn static_user(mut ctx: Context) -> Context {
        ctx.response.text("static");
        ctx
    }
    router.get("/users/:id", by_id).unwrap();
    router.get("/users/static", static_user).unwrap();

    let writer = router
        .dispatch(Method::GET, "/users/static", HeaderMap::new(), Bytes::new(), None)
        .await
        .unwrap();
    assert_eq!(writer.status_code(), StatusCode::OK);
    assert_eq!(writer.body_len(), "static".len());

    let writer = router
        .dispatch(Method::GET, "/users/42", HeaderMap::new(), Bytes::new(), None)
        .await
        .unwrap();
    assert_eq!(writer.body_len(), "id=42".len());
}

#[tokio::test]
async fn catch_all_captures_remaining_suffix_including_empty() {
    let router = Router::new();
    async fn serve_file(mut ctx: Context) -> Context {
        let path = ctx.request.param("path").unwrap_or("").to_string();
        ctx.response.text(format!("file:{path}"));
        ctx
    }
    router.get("/files/*path", serve_file).unwrap();

    let writer = router
        .dispatch(Method::GET, "/files/img/logo.png", HeaderMap::new(), Bytes::new(), None)
        .await
        .unwrap();
    assert_eq!(writer.body_len(), "file:img/logo.png".len());

    let writer = router
        .dispatch(Method::GET, "/files", HeaderMap::new(), Bytes::new(), None)
        .await
        .unwrap();
    assert_eq!(writer.body_len(), "file:".len());
}

#[tokio::test]
async fn parametric_segment_does_not_absorb_a_shorter_request() {
    let router = Router::new();
    async fn noop(ctx: Context) -> Context {
        ctx
    }
    router.get("/api/:version/files/*path", noop).unwrap();

    assert!(
        router
            .dispatch(Method::GET, "/api/v2", HeaderMap::new(), Bytes::new(), None)
            .await
            .is_none()
    );
}

#[tokio::test]
async fn lookup_miss_returns_none_not_an_error() {
    let router = Router::new();
    assert!(get(&router, "/nowhere").await.is_none());
}

#[tokio::test]
async fn removed_route_no_longer_matches() {
    let router = Router::new();
    async fn noop(ctx: Context) -> Context {
        ctx
    }
    router.get("/users/:id", noop).unwrap();
    assert!(get(&router, "/users/1").await.is_some());

    assert!(router.remove(Method::GET, "/users/:id").unwrap());
    assert!(get(&router, "/users/1").await.is_none());
}

#[tokio::test]
async fn query_string_is_parsed_and_reachable_from_the_handler() {
    let router = Router::new();
    async fn echo_query(mut ctx: Context) -> Context {
        let cat = ctx.request.query().get("cat").unwrap_or("").to_string();
        ctx.response.text(cat);
        ctx
    }
    router.get("/search", echo_query).unwrap();

    let writer = router
        .dispatch(Method::GET, "/search?cat=images%2Fpng", HeaderMap::new(), Bytes::new(), None)
        .await
        .unwrap();
    assert_eq!(writer.body_len(), "images/png".len());
}

#[tokio::test]
async fn nested_group_middleware_runs_before_the_terminal_handler_in_order() {
    let router = Router::new();
    async fn tag_a(mut ctx: Context) -> Context {
        ctx.set("trail", vec!["a"]);
        ctx.next().await
    }
    async fn tag_b(mut ctx: Context) -> Context {
        let mut trail = ctx.get::<Vec<&str>>("trail").unwrap().clone();
        trail.push("b");
        ctx.set("trail", trail);
        ctx.next().await
    }
    async fn terminal(mut ctx: Context) -> Context {
        let trail = ctx.get::<Vec<&str>>("trail").unwrap().join(",");
        ctx.response.text(trail);
        ctx
    }

    let api = router.group("/api").use_middleware(tag_a);
    let v1 = api.group("/v1").use_middleware(tag_b);
    v1.get("/ping", terminal).unwrap();

    let writer = router
        .dispatch(Method::GET, "/api/v1/ping", HeaderMap::new(), Bytes::new(), None)
        .await
        .unwrap();
    assert_eq!(writer.body_len(), "a,b".len());
}

#[tokio::test]
async fn abort_in_middleware_prevents_the_terminal_handler_from_running() {
    let router = Router::new();
    async fn require_auth(mut ctx: Context) -> Context {
        if ctx.request.header("authorization").is_none() {
            ctx.abort();
            ctx.response.status(StatusCode::UNAUTHORIZED);
        }
        ctx.next().await
    }
    async fn secret(mut ctx: Context) -> Context {
        ctx.response.status(StatusCode::OK).text("secret");
        ctx
    }

    let api = router.group("").use_middleware(require_auth);
    api.get("/secret", secret).unwrap();

    let writer = router
        .dispatch(Method::GET, "/secret", HeaderMap::new(), Bytes::new(), None)
        .await
        .unwrap();
    assert_eq!(writer.status_code(), StatusCode::UNAUTHORIZED);
    assert_eq!(writer.body_len(), 0);
}

#[tokio::test]
async fn duplicate_route_registration_is_rejected_at_registration_not_lookup() {
    let router = Router::new();
    async fn noop(ctx: Context) -> Context {
        ctx
    }
    router.get("/dup", noop).unwrap();
    let err = router.get("/dup", noop);
    assert!(err.is_err());
}
