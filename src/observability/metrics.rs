//! Metrics collection and exposition.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::time::Instant;

use chrono::{DateTime, Utc};
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use serde::{Deserialize, Serialize};

/// Cheap per-proxy gauges, snapshotted by the admin metrics endpoint.
#[derive(Debug, Default)]
pub struct ProxyMetrics {
    total_requests: AtomicU64,
    active_connections: AtomicI64,
}

impl ProxyMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn request_started(&self) {
        self.total_requests.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_finished(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            total_requests: self.total_requests.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            timestamp: Utc::now(),
        }
    }
}

/// Point-in-time view returned by the admin API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub total_requests: u64,
    pub active_connections: i64,
    pub timestamp: DateTime<Utc>,
}

/// Initialize the Prometheus exporter and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .expect("failed to install Prometheus recorder");

    tracing::info!("Metrics server listening on http://{}", addr);
}

/// Record one completed proxy request.
pub fn record_request(method: &str, status: u16, backend: &str, started: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
        ("backend", backend.to_string()),
    ];

    counter!("proxy_requests_total", &labels).increment(1);
    histogram!("proxy_request_duration_seconds", &labels).record(started.elapsed().as_secs_f64());
}

/// Record a backend liveness flip.
pub fn record_backend_health(backend: &str, alive: bool) {
    let val = if alive { 1.0 } else { 0.0 };
    gauge!("proxy_backend_alive", "backend" => backend.to_string()).set(val);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let m = ProxyMetrics::new();
        m.request_started();
        m.request_started();
        m.request_finished();

        let snap = m.snapshot();
        assert_eq!(snap.total_requests, 2);
        assert_eq!(snap.active_connections, 1);
    }

    #[test]
    fn test_snapshot_serializes() {
        let m = ProxyMetrics::new();
        m.request_started();
        let json = serde_json::to_value(m.snapshot()).unwrap();
        assert_eq!(json["total_requests"], 1);
        assert_eq!(json["active_connections"], 1);
        assert!(json["timestamp"].is_string());
    }
}
