//! Minimal corehttp server example — CRUD-style JSON endpoints, a group
//! with logging middleware, and the built-in health checks.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/api/users/42
//!   curl -X POST http://localhost:3000/api/users \
//!        -H 'content-type: application/json' \
//!        -d '{"name":"alice"}'
//!   curl -X DELETE http://localhost:3000/api/users/42
//!   curl http://localhost:3000/healthz

use corehttp::{Context, Router, Server, health, middleware};
use serde_json::json;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let app = Router::new();
    app.get("/healthz", health::liveness).unwrap();
    app.get("/readyz", health::readiness).unwrap();

    let api = app.group("/api").use_middleware(middleware::logging);
    api.get("/users/:id", get_user).unwrap();
    api.post("/users", create_user).unwrap();
    api.delete("/users/:id", delete_user).unwrap();

    Server::bind("0.0.0.0:3000").serve(app).await.expect("server error");
}

// GET /api/users/:id
async fn get_user(mut ctx: Context) -> Context {
    let id = ctx.request.param("id").unwrap_or("unknown").to_string();
    let _ = ctx.response.json(&json!({ "id": id, "name": "alice" }));
    ctx
}

// POST /api/users
async fn create_user(mut ctx: Context) -> Context {
    if ctx.request.body().is_empty() {
        ctx.response.status(http::StatusCode::BAD_REQUEST);
        return ctx;
    }
    ctx.response
        .status(http::StatusCode::CREATED)
        .header(http::header::LOCATION, http::HeaderValue::from_static("/api/users/99"));
    let _ = ctx.response.json(&json!({ "id": "99", "name": "new_user" }));
    ctx
}

// DELETE /api/users/:id → 204 No Content
async fn delete_user(mut ctx: Context) -> Context {
    ctx.response.status(http::StatusCode::NO_CONTENT);
    ctx
}
