//! # corehttp
//!
//! A composable HTTP toolkit: a radix-tree route matcher with a
//! middleware/handler pipeline on the server side, paired with a retrying,
//! caching request execution engine on the client side. The two halves
//! share value types ([`Request`]/[`Response`] server-side,
//! [`client::ClientRequest`]/[`client::ClientResponse`] client-side) but are
//! otherwise independent — use one, the other, or both.
//!
//! ## Server quick start
//!
//! ```rust,no_run
//! use corehttp::{Context, Router, Server, health};
//!
//! #[tokio::main]
//! async fn main() {
//!     tracing_subscriber::fmt::init();
//!
//!     let app = Router::new();
//!     app.get("/", hello).unwrap();
//!     app.get("/users/:id", get_user).unwrap();
//!     app.get("/healthz", health::liveness).unwrap();
//!     app.get("/readyz", health::readiness).unwrap();
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn hello(mut ctx: Context) -> Context {
//!     ctx.response.text("hello from corehttp");
//!     ctx
//! }
//!
//! async fn get_user(mut ctx: Context) -> Context {
//!     let id = ctx.request.param("id").unwrap_or("unknown").to_string();
//!     ctx.response.text(format!("user {id}"));
//!     ctx
//! }
//! ```
//!
//! ## Client quick start
//!
//! ```rust,no_run
//! use corehttp::client::{Client, ClientRequest};
//!
//! # async fn go() -> Result<(), corehttp::Error> {
//! let client = Client::builder().base_url("https://api.example.com").build();
//! let resp = client.execute(ClientRequest::get("/users/:id").path_param("id", "42")).await?;
//! println!("{}", resp.status());
//! # Ok(()) }
//! ```
//!
//! ## What's out of scope
//!
//! No HTTP/1.1 or HTTP/2 wire parsing of its own (delegated to `hyper` /
//! `hyper-util`), no templating/ORM layer, no arbitrary per-segment regex
//! patterns — only literal, `:name`, and `*name` route segments.

pub mod bufpool;
pub mod cancel;
pub mod client;
pub mod codec;
pub mod context;
mod error;
mod handler;
pub mod health;
pub mod middleware;
pub mod query;
mod request;
mod response;
pub mod router;
mod server;
pub mod url;

pub use context::Context;
pub use error::Error;
pub use handler::Handler;
pub use request::Request;
pub use response::ResponseWriter;
pub use router::{Router, RouterGroup};
pub use server::Server;

pub use http::Method;
