//! HTTP server setup and the request pipeline.
//!
//! # Responsibilities
//! - Build the data-plane Axum router (liveness endpoint + catch-all)
//! - Run the per-request pipeline: counters → match → auth → rate limit →
//!   breaker gate → request rewrite → cache lookup → pool selection →
//!   forward with retry → response rewrite → cache store → access log
//! - Hold the shared state handed to every subsystem
//!
//! # Design Decisions
//! - Policy denials short-circuit with their fixed status codes
//!   (401 / 429 / 503)
//! - The access log and the active-connections gauge are driven by a
//!   drop guard, so a client disconnect mid-forward still produces
//!   exactly one record
//! - The request body is buffered up front so retry attempts can replay it

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::response::{IntoResponse, Response};
use axum::routing::{any, get};
use axum::Router;
use chrono::{DateTime, Utc};
use http::header::{HeaderValue, COOKIE, HOST};
use http::{Request, StatusCode};
use http_body_util::BodyExt;
use rand::Rng;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::ProxyConfig;
use crate::health::HealthSupervisors;
use crate::http::forward::{forward_with_retry, ForwardError};
use crate::http::{new_http_client, HttpClient};
use crate::load_balancer::backend::InvalidTarget;
use crate::load_balancer::pool::{Pool, SelectionKeys};
use crate::observability::access_log::{AccessLog, LogSink};
use crate::observability::metrics::{record_request, ProxyMetrics};
use crate::policy::{auth, cache::ResponseCache, circuit_breaker::BreakerRegistry, headers, rate_limit::RateLimiter};
use crate::routing::matcher::MatchInput;
use crate::routing::route::{Algorithm, ConfigRoute, Route};
use crate::routing::RouteTable;

const LOG_SINK_CAPACITY: usize = 1000;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ProxyConfig>,
    pub table: Arc<RouteTable>,
    pub limiter: Arc<RateLimiter>,
    pub breakers: Arc<BreakerRegistry>,
    pub cache: Arc<ResponseCache>,
    pub metrics: Arc<ProxyMetrics>,
    pub logs: Arc<LogSink>,
    pub client: HttpClient,
    pub health: Arc<HealthSupervisors>,
}

impl AppState {
    /// Initialize all subsystems. Must be called from within a Tokio
    /// runtime (the log sink spawns its pump task).
    pub fn new(config: ProxyConfig) -> Result<Self, InvalidTarget> {
        let client = new_http_client();

        let default_pool = if config.default_targets.is_empty() {
            None
        } else {
            Some(Arc::new(Pool::from_targets(
                &config.default_targets,
                None,
                client.clone(),
            )?))
        };

        Ok(Self {
            config: Arc::new(config),
            table: Arc::new(RouteTable::new(default_pool)),
            limiter: Arc::new(RateLimiter::new()),
            breakers: Arc::new(BreakerRegistry::new()),
            cache: Arc::new(ResponseCache::new()),
            metrics: Arc::new(ProxyMetrics::new()),
            logs: LogSink::new(LOG_SINK_CAPACITY),
            client,
            health: Arc::new(HealthSupervisors::new()),
        })
    }

    /// Atomically install a new route set and restart the health-check
    /// supervisors. Any invalid backend URL rejects the whole set; the
    /// active table is left untouched.
    pub fn apply_routes(&self, configs: Vec<ConfigRoute>) -> Result<usize, InvalidTarget> {
        let mut routes = Vec::with_capacity(configs.len());
        for config in configs {
            routes.push(Arc::new(Route::build(config, &self.client)?));
        }
        let count = routes.len();

        self.table.replace(routes);
        let snapshot = self.table.snapshot();
        self.health
            .restart(&snapshot, self.table.default_pool().cloned());

        info!(count, "route table replaced");
        Ok(count)
    }
}

/// Build the data-plane router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/", any(proxy_handler))
        .route("/{*path}", any(proxy_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health_handler() -> &'static str {
    "OK"
}

/// Drop guard covering the whole request: bumps the gauges on entry and,
/// on drop (normal return or client disconnect), decrements the active
/// gauge and emits exactly one access log record.
struct RequestTracker {
    sink: Arc<LogSink>,
    metrics: Arc<ProxyMetrics>,
    timestamp: DateTime<Utc>,
    started: Instant,
    method: String,
    path: String,
    client_ip: String,
    status: u16,
    backend_url: String,
}

impl RequestTracker {
    fn new(state: &AppState, method: &http::Method, path: &str, client_ip: String) -> Self {
        state.metrics.request_started();
        Self {
            sink: state.logs.clone(),
            metrics: state.metrics.clone(),
            timestamp: Utc::now(),
            started: Instant::now(),
            method: method.as_str().to_string(),
            path: path.to_string(),
            client_ip,
            status: StatusCode::OK.as_u16(),
            backend_url: String::new(),
        }
    }
}

impl Drop for RequestTracker {
    fn drop(&mut self) {
        self.metrics.request_finished();

        let backend_label = if self.backend_url.is_empty() {
            "-"
        } else {
            self.backend_url.as_str()
        };
        record_request(&self.method, self.status, backend_label, self.started);

        self.sink.emit(AccessLog {
            timestamp: self.timestamp,
            method: std::mem::take(&mut self.method),
            path: std::mem::take(&mut self.path),
            status: self.status,
            duration_ms: self.started.elapsed().as_millis() as u64,
            backend_url: std::mem::take(&mut self.backend_url),
            client_ip: std::mem::take(&mut self.client_ip),
        });
    }
}

/// Main proxy handler: the per-request pipeline.
async fn proxy_handler(
    State(state): State<AppState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    request: Request<Body>,
) -> Response {
    let (mut parts, body) = request.into_parts();

    let client_ip = addr.ip().to_string();
    let path = parts.uri.path().to_string();
    let query = parts.uri.query().map(str::to_string);
    let method = parts.method.clone();

    let mut tracker = RequestTracker::new(&state, &method, &path, client_ip.clone());

    // Buffer the body so retry attempts can replay it.
    let body_bytes = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(error) => {
            warn!(error = %error, "failed to read request body");
            tracker.status = StatusCode::BAD_REQUEST.as_u16();
            return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
        }
    };

    let host = parts
        .headers
        .get(HOST)
        .and_then(|v| v.to_str().ok())
        .map(|h| h.split(':').next().unwrap_or(h).to_string())
        .unwrap_or_default();

    let route = {
        let input = MatchInput {
            method: &method,
            path: &path,
            query: query.as_deref(),
            headers: &parts.headers,
            host: &host,
        };
        state.table.match_request(&input)
    };

    let mut capture: Option<(String, u64)> = None;
    let mut selected = None;

    if let Some(route) = &route {
        // Auth
        if let Some(auth_policy) = &route.config.auth {
            if !auth::authorize(auth_policy, &parts.headers, query.as_deref()) {
                tracker.status = StatusCode::UNAUTHORIZED.as_u16();
                return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
            }
        }

        // Rate limit
        if let Some(rate_policy) = &route.config.rate_limit {
            if !state.limiter.allow(route.path(), rate_policy) {
                tracker.status = StatusCode::TOO_MANY_REQUESTS.as_u16();
                return (StatusCode::TOO_MANY_REQUESTS, "Rate limit exceeded").into_response();
            }
        }

        // Circuit breaker gate
        if let Some(breaker_policy) = &route.config.circuit_breaker {
            if !state.breakers.allow(route.path(), breaker_policy) {
                tracker.status = StatusCode::SERVICE_UNAVAILABLE.as_u16();
                return (StatusCode::SERVICE_UNAVAILABLE, "Circuit breaker open").into_response();
            }
        }

        // Request header rewrite
        if let Some(header_policy) = &route.config.headers {
            headers::apply_request(&mut parts.headers, header_policy);
        }

        // Cache lookup
        if let Some(cache_policy) = route.config.cache.as_ref().filter(|c| c.enabled) {
            let key = parts
                .uri
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| path.clone());

            if let Some(entry) = state.cache.lookup(&key) {
                tracker.status = StatusCode::OK.as_u16();
                let mut response = Response::new(Body::from(entry.body));
                *response.headers_mut() = entry.headers;
                response
                    .headers_mut()
                    .insert("x-gp-cache", HeaderValue::from_static("HIT"));
                return response;
            }
            capture = Some((key, cache_policy.ttl));
        }

        // Pool selection, with the canary roll first
        let pool = match (&route.config.canary, &route.canary_pool) {
            (Some(canary), Some(canary_pool))
                if rand::thread_rng().gen_range(0..100u32) < canary.weight =>
            {
                canary_pool
            }
            _ => &route.pool,
        };

        let keys = SelectionKeys {
            client_ip: Some(client_ip.as_str()),
            cookie_header: parts.headers.get(COOKIE).and_then(|v| v.to_str().ok()),
        };
        selected = pool.select(route.config.algorithm, route.config.affinity.as_ref(), keys);
    }

    // No route (or an empty pool): fall back to the default pool.
    if selected.is_none() {
        if let Some(default_pool) = state.table.default_pool() {
            selected = default_pool.select(Algorithm::RoundRobin, None, SelectionKeys::default());
        }
    }

    let Some(backend) = selected else {
        tracker.status = StatusCode::SERVICE_UNAVAILABLE.as_u16();
        return (StatusCode::SERVICE_UNAVAILABLE, "No healthy backends available").into_response();
    };
    tracker.backend_url = backend.url().to_string();

    // Forward with per-attempt deadline and retry; every attempt feeds
    // the breaker.
    let resilience = route.as_ref().and_then(|r| r.config.resilience.as_ref());
    let record = |ok: bool| {
        if let Some(route) = &route {
            if let Some(breaker_policy) = &route.config.circuit_breaker {
                if ok {
                    state.breakers.record_success(route.path());
                } else {
                    state.breakers.record_failure(route.path(), breaker_policy);
                }
            }
        }
    };

    let mut response =
        match forward_with_retry(&backend, &parts, &body_bytes, resilience, record).await {
            Ok(upstream) => {
                tracker.status = upstream.status().as_u16();
                let (upstream_parts, upstream_body) = upstream.into_parts();
                Response::from_parts(upstream_parts, Body::new(upstream_body))
            }
            Err(ForwardError::Timeout) => {
                tracker.status = StatusCode::GATEWAY_TIMEOUT.as_u16();
                (StatusCode::GATEWAY_TIMEOUT, "Upstream attempt timed out").into_response()
            }
            Err(ForwardError::Transport(error)) => {
                warn!(backend = %backend.url(), error = %error, "upstream request failed");
                tracker.status = StatusCode::BAD_GATEWAY.as_u16();
                (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
            }
        };

    // Response header rewrite
    if let Some(route) = &route {
        if let Some(header_policy) = &route.config.headers {
            headers::apply_response(response.headers_mut(), header_policy);
        }
    }

    // Cache store: only 200s, only on a recorded miss
    if let Some((key, ttl)) = capture {
        response
            .headers_mut()
            .insert("x-gp-cache", HeaderValue::from_static("MISS"));

        if response.status() == StatusCode::OK {
            let (response_parts, response_body) = response.into_parts();
            match response_body.collect().await {
                Ok(collected) => {
                    let bytes = collected.to_bytes();
                    state.cache.store(
                        key,
                        bytes.clone(),
                        &response_parts.headers,
                        Duration::from_secs(ttl),
                    );
                    response = Response::from_parts(response_parts, Body::from(bytes));
                }
                Err(error) => {
                    warn!(error = %error, "failed to buffer upstream response for caching");
                    tracker.status = StatusCode::BAD_GATEWAY.as_u16();
                    response =
                        (StatusCode::BAD_GATEWAY, "Upstream body read failed").into_response();
                }
            }
        }
    }

    response
}
