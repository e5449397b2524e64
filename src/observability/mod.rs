//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Request pipeline produces:
//!     → access_log.rs (one AccessLog per request, non-blocking sink)
//!     → metrics.rs (atomic gauges + Prometheus counters)
//!     → tracing events (structured, via logging.rs setup)
//!
//! Consumers:
//!     → Admin API log stream (SSE subscribers drain the sink)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - The data plane never blocks on a slow observer: the sink drops on a
//!   full buffer and counts the drops
//! - Metrics are cheap (atomic increments)

pub mod access_log;
pub mod logging;
pub mod metrics;

pub use access_log::{AccessLog, LogSink};
pub use metrics::ProxyMetrics;
