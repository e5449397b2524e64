//! Forwarding with per-attempt deadlines and bounded retry.
//!
//! # Responsibilities
//! - Wrap every attempt in the route's deadline (default 30 s)
//! - Retry on upstream status >= 500 or transport failure, up to
//!   `max_retries` extra attempts against the same backend
//! - Feed every attempt's outcome to the circuit breaker
//!
//! # Design Decisions
//! - The request body is buffered by the caller so attempts can be
//!   replayed
//! - A timed-out attempt maps to 504, a transport failure to 502; both
//!   count as breaker failures

use std::time::Duration;

use axum::body::Body;
use bytes::Bytes;
use http::request::Parts;
use http::Request;
use hyper::body::Incoming;
use http::Response;
use tracing::{debug, warn};

use crate::load_balancer::backend::Backend;
use crate::routing::route::ResiliencePolicy;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Terminal forwarding failure after all attempts are spent.
#[derive(Debug)]
pub enum ForwardError {
    /// The per-attempt deadline elapsed.
    Timeout,
    /// The transport failed (connect, reset, malformed response).
    Transport(hyper_util::client::legacy::Error),
}

impl std::fmt::Display for ForwardError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ForwardError::Timeout => write!(f, "upstream attempt timed out"),
            ForwardError::Transport(e) => write!(f, "upstream transport error: {e}"),
        }
    }
}

impl std::error::Error for ForwardError {}

/// Forward a request to one backend, retrying per the resilience policy.
/// `record` receives the outcome of every attempt (true on status < 500).
pub async fn forward_with_retry(
    backend: &Backend,
    parts: &Parts,
    body: &Bytes,
    resilience: Option<&ResiliencePolicy>,
    record: impl Fn(bool),
) -> Result<Response<Incoming>, ForwardError> {
    let max_retries = resilience.map(|r| r.max_retries).unwrap_or(0);
    let timeout = resilience
        .filter(|r| r.timeout_ms > 0)
        .map(|r| Duration::from_millis(r.timeout_ms))
        .unwrap_or(DEFAULT_TIMEOUT);

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let request = attempt_request(parts, body);

        match tokio::time::timeout(timeout, backend.forward(request)).await {
            Ok(Ok(response)) if response.status().as_u16() < 500 => {
                record(true);
                return Ok(response);
            }
            Ok(Ok(response)) => {
                record(false);
                if attempt > max_retries {
                    return Ok(response);
                }
                debug!(
                    backend = %backend.url(),
                    status = response.status().as_u16(),
                    attempt,
                    "retrying upstream"
                );
            }
            Ok(Err(error)) => {
                record(false);
                if attempt > max_retries {
                    return Err(ForwardError::Transport(error));
                }
                warn!(backend = %backend.url(), error = %error, attempt, "retrying after transport error");
            }
            Err(_) => {
                record(false);
                if attempt > max_retries {
                    return Err(ForwardError::Timeout);
                }
                warn!(backend = %backend.url(), attempt, "retrying after attempt deadline");
            }
        }
    }
}

/// Build one attempt from the buffered request. The HTTP version is left
/// at the client default rather than copied from the inbound request.
fn attempt_request(parts: &Parts, body: &Bytes) -> Request<Body> {
    let mut request = Request::new(Body::from(body.clone()));
    *request.method_mut() = parts.method.clone();
    *request.uri_mut() = parts.uri.clone();
    *request.headers_mut() = parts.headers.clone();
    request
}
