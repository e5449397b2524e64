//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single upstream target
//! - Carry the liveness flag written by the health checker
//! - Forward a request by rewriting its URI onto the target

use std::sync::atomic::{AtomicBool, Ordering};

use axum::body::Body;
use http::header::{HeaderValue, HOST};
use http::uri::{PathAndQuery, Scheme, Uri};
use http::Request;
use hyper::body::Incoming;
use http::Response;

use crate::http::HttpClient;
use crate::PRODUCT_NAME;

/// Error for a backend URL that cannot be used as a forwarding target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidTarget(pub String);

impl std::fmt::Display for InvalidTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid backend URL: {}", self.0)
    }
}

impl std::error::Error for InvalidTarget {}

/// A single upstream target.
pub struct Backend {
    /// The target URL exactly as configured (echoed back by the API).
    url: String,
    uri: Uri,
    /// Liveness flag. Written only by the health checker; a single relaxed
    /// word is enough.
    alive: AtomicBool,
    weight: i32,
    client: HttpClient,
}

impl std::fmt::Debug for Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backend")
            .field("url", &self.url)
            .field("alive", &self.is_alive())
            .field("weight", &self.weight)
            .finish()
    }
}

impl Backend {
    /// Parse and validate a target URL. The URL must carry a scheme and an
    /// authority; the path component is ignored for forwarding.
    pub fn new(target: &str, weight: i32, client: HttpClient) -> Result<Self, InvalidTarget> {
        let uri: Uri = target
            .parse()
            .map_err(|_| InvalidTarget(target.to_string()))?;
        if uri.scheme().is_none() || uri.authority().is_none() {
            return Err(InvalidTarget(target.to_string()));
        }

        Ok(Self {
            url: target.to_string(),
            uri,
            alive: AtomicBool::new(true),
            weight,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn weight(&self) -> i32 {
        self.weight
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Relaxed)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Relaxed);
    }

    /// Forward one request attempt to this backend. The request keeps its
    /// path and query; scheme and authority are replaced with the target's.
    /// Adds `X-Forwarded-Host` (original Host) and `X-Proxy-By`.
    pub async fn forward(
        &self,
        mut request: Request<Body>,
    ) -> Result<Response<Incoming>, hyper_util::client::legacy::Error> {
        if let Some(host) = request.headers().get(HOST).cloned() {
            request.headers_mut().insert("x-forwarded-host", host);
        }
        request
            .headers_mut()
            .insert("x-proxy-by", HeaderValue::from_static(PRODUCT_NAME));

        let mut parts = request.uri().clone().into_parts();
        parts.scheme = Some(self.uri.scheme().cloned().unwrap_or(Scheme::HTTP));
        parts.authority = self.uri.authority().cloned();
        if parts.path_and_query.is_none() {
            parts.path_and_query = Some(PathAndQuery::from_static("/"));
        }
        if let Ok(uri) = Uri::from_parts(parts) {
            *request.uri_mut() = uri;
        }

        self.client.request(request).await
    }
}
