//! HTTP data plane.
//!
//! # Data Flow
//! ```text
//! Listener (axum)
//!     → server.rs (pipeline: match → policies → select → forward → log)
//!     → forward.rs (per-attempt deadline, retry on >= 500, breaker feed)
//!     → Backend forwarder (hyper legacy client)
//! ```

pub mod forward;
pub mod server;

use axum::body::Body;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

/// The forwarding client type shared by backends and the health checker.
pub type HttpClient = Client<HttpConnector, Body>;

/// Build a pooled HTTP/1.1 client.
pub fn new_http_client() -> HttpClient {
    Client::builder(TokioExecutor::new()).build(HttpConnector::new())
}
