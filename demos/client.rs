//! Minimal corehttp client example — a request through the execution loop
//! with retries, default headers, and an in-memory cache.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example client -- https://httpbin.org/get

use std::time::Duration;

use corehttp::client::cache::InMemoryCache;
use corehttp::client::{Client, ClientRequest, RetryPolicy};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let target = std::env::args().nth(1).unwrap_or_else(|| "https://httpbin.org/get".to_string());

    let client = Client::builder()
        .default_header(http::header::ACCEPT, http::HeaderValue::from_static("application/json"))
        .retry_policy(RetryPolicy::builder().max_retries(3).max_retry_time(Duration::from_secs(5)).build())
        .cache(InMemoryCache::new())
        .build();

    let req = ClientRequest::get(&target).use_cache(Duration::from_secs(30));

    match client.execute(req).await {
        Ok(resp) => {
            println!("status: {}", resp.status());
            println!("body: {}", resp.text().unwrap_or_default());
        }
        Err(e) => eprintln!("request failed: {e}"),
    }
}
