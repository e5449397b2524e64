//! Access logging: per-request records delivered through a bounded,
//! non-blocking sink.
//!
//! # Responsibilities
//! - Record exactly one AccessLog per completed (or rejected) request
//! - Never block the data plane: full buffer means the record is dropped
//!   and counted
//! - Fan records out to any number of streaming subscribers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

/// One proxied (or rejected) request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLog {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub duration_ms: u64,
    /// Backend the request was forwarded to; empty when none was reached.
    pub backend_url: String,
    pub client_ip: String,
}

/// Bounded log sink. Producers `try_send` into an mpsc channel; a pump
/// task fans records out to broadcast subscribers so one slow reader
/// cannot stall another.
#[derive(Debug)]
pub struct LogSink {
    tx: mpsc::Sender<AccessLog>,
    subscribers: broadcast::Sender<AccessLog>,
    dropped: AtomicU64,
}

impl LogSink {
    /// Create a sink and spawn its pump task. Must be called from within a
    /// Tokio runtime.
    pub fn new(capacity: usize) -> Arc<Self> {
        let (tx, mut rx) = mpsc::channel::<AccessLog>(capacity);
        let (subscribers, _) = broadcast::channel(capacity);

        let fanout = subscribers.clone();
        tokio::spawn(async move {
            while let Some(entry) = rx.recv().await {
                // No subscribers is fine; the record is simply discarded.
                let _ = fanout.send(entry);
            }
        });

        Arc::new(Self {
            tx,
            subscribers,
            dropped: AtomicU64::new(0),
        })
    }

    /// Push one record. Never blocks; drops (and counts) on a full buffer.
    pub fn emit(&self, entry: AccessLog) {
        if self.tx.try_send(entry).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Subscribe to the live stream. Slow subscribers lag and lose
    /// records; they never apply backpressure to producers.
    pub fn subscribe(&self) -> broadcast::Receiver<AccessLog> {
        self.subscribers.subscribe()
    }

    /// Number of records dropped because the buffer was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str) -> AccessLog {
        AccessLog {
            timestamp: Utc::now(),
            method: "GET".to_string(),
            path: path.to_string(),
            status: 200,
            duration_ms: 1,
            backend_url: "http://127.0.0.1:9001".to_string(),
            client_ip: "127.0.0.1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_emit_reaches_subscriber() {
        let sink = LogSink::new(16);
        let mut rx = sink.subscribe();

        sink.emit(entry("/a"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.path, "/a");
        assert_eq!(sink.dropped(), 0);
    }

    #[tokio::test]
    async fn test_full_buffer_drops_and_counts() {
        // Current-thread runtime: the pump cannot run between emits, so a
        // tight emit loop deterministically overfills the buffer.
        let sink = LogSink::new(2);
        for i in 0..10 {
            sink.emit(entry(&format!("/{i}")));
        }
        assert_eq!(sink.dropped(), 8);
    }

    #[tokio::test]
    async fn test_multiple_subscribers_each_get_records() {
        let sink = LogSink::new(16);
        let mut rx1 = sink.subscribe();
        let mut rx2 = sink.subscribe();

        sink.emit(entry("/fan"));

        assert_eq!(rx1.recv().await.unwrap().path, "/fan");
        assert_eq!(rx2.recv().await.unwrap().path, "/fan");
    }

    #[tokio::test]
    async fn test_serializes_to_json() {
        let json = serde_json::to_value(entry("/j")).unwrap();
        assert_eq!(json["path"], "/j");
        assert_eq!(json["status"], 200);
        assert!(json["timestamp"].is_string());
    }
}
