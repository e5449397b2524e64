//! Background liveness probing.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Body;
use http::uri::Uri;
use http::{Method, Request};
use rand::Rng;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::http::{new_http_client, HttpClient};
use crate::load_balancer::backend::Backend;
use crate::load_balancer::pool::Pool;
use crate::observability::metrics::record_backend_health;
use crate::routing::route::{HealthCheckPolicy, Route};

const DEFAULT_INTERVAL_SECS: u64 = 10;
const DEFAULT_TIMEOUT_SECS: u64 = 2;

/// Owns the set of running health-check supervisors. Every `UpdateRoutes`
/// cancels the old generation and spawns a new one.
pub struct HealthSupervisors {
    handles: Mutex<Vec<JoinHandle<()>>>,
    client: HttpClient,
}

impl Default for HealthSupervisors {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthSupervisors {
    pub fn new() -> Self {
        Self {
            handles: Mutex::new(Vec::new()),
            client: new_http_client(),
        }
    }

    /// Cancel all running supervisors and spawn a fresh set: one per route
    /// declaring a health check, plus one for the default pool.
    pub fn restart(&self, routes: &[Arc<Route>], default_pool: Option<Arc<Pool>>) {
        let mut handles = self.handles.lock().expect("health supervisor mutex poisoned");
        for handle in handles.drain(..) {
            handle.abort();
        }

        for route in routes {
            let Some(check) = route.config.health_check.clone() else {
                continue;
            };
            let pool = route.pool.clone();
            let label = route.path().to_string();
            let client = self.client.clone();
            handles.push(tokio::spawn(async move {
                supervise(pool, check, label, client).await;
            }));
        }

        if let Some(pool) = default_pool {
            let check = HealthCheckPolicy {
                path: String::new(),
                interval: DEFAULT_INTERVAL_SECS,
                timeout: DEFAULT_TIMEOUT_SECS,
            };
            let client = self.client.clone();
            handles.push(tokio::spawn(async move {
                supervise(pool, check, "default".to_string(), client).await;
            }));
        }

        debug!(supervisors = handles.len(), "health supervisors restarted");
    }

    /// Cancel every supervisor. Used on shutdown.
    pub fn shutdown(&self) {
        let mut handles = self.handles.lock().expect("health supervisor mutex poisoned");
        for handle in handles.drain(..) {
            handle.abort();
        }
    }

    #[cfg(test)]
    pub fn supervisor_count(&self) -> usize {
        self.handles
            .lock()
            .expect("health supervisor mutex poisoned")
            .len()
    }
}

async fn supervise(pool: Arc<Pool>, check: HealthCheckPolicy, label: String, client: HttpClient) {
    let interval = if check.interval < 1 {
        Duration::from_secs(DEFAULT_INTERVAL_SECS)
    } else {
        Duration::from_secs(check.interval)
    };
    let timeout = if check.timeout == 0 {
        Duration::from_secs(DEFAULT_TIMEOUT_SECS)
    } else {
        Duration::from_secs(check.timeout)
    };

    // Jitter the start so supervisors spawned together do not probe in
    // lockstep.
    let jitter = rand::thread_rng().gen_range(0..250);
    tokio::time::sleep(Duration::from_millis(jitter)).await;

    loop {
        tokio::time::sleep(interval).await;

        for backend in pool.backends() {
            let Some(uri) = check_uri(backend, &check.path) else {
                continue;
            };
            let alive = probe(&client, uri, timeout).await;
            if alive != backend.is_alive() {
                backend.set_alive(alive);
                record_backend_health(backend.url(), alive);
                info!(
                    route = %label,
                    backend = %backend.url(),
                    status = if alive { "up" } else { "down" },
                    "backend liveness changed"
                );
            }
        }
    }
}

/// Resolve the probe URL: absolute when the configured path starts with
/// "http", otherwise the backend URL with the path substituted.
fn check_uri(backend: &Backend, path: &str) -> Option<Uri> {
    if path.starts_with("http") {
        return path.parse().ok();
    }

    let path_and_query = if path.is_empty() { "/" } else { path };
    Uri::builder()
        .scheme(backend.uri().scheme()?.clone())
        .authority(backend.uri().authority()?.clone())
        .path_and_query(path_and_query)
        .build()
        .ok()
}

async fn probe(client: &HttpClient, uri: Uri, timeout: Duration) -> bool {
    let request = Request::builder()
        .method(Method::HEAD)
        .uri(uri)
        .body(Body::empty());
    let Ok(request) = request else {
        return false;
    };

    match tokio::time::timeout(timeout, client.request(request)).await {
        Ok(Ok(response)) => {
            let status = response.status().as_u16();
            (200..500).contains(&status)
        }
        _ => false,
    }
}
