//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Route matched → pool chosen (primary or canary roll)
//!     → pool.rs:
//!         - affinity key present → stable hash over live backends
//!         - round_robin (atomic cursor) / random / weighted
//!     → backend.rs (forwarding handle, liveness flag, weight)
//! ```
//!
//! # Design Decisions
//! - Selection only considers live backends; an all-dead pool degrades to
//!   the full list rather than refusing service
//! - The cursor is a plain atomic; cross-thread selection order is not
//!   serialized
//! - Backend weight is immutable for the backend's lifetime

pub mod backend;
pub mod pool;

pub use backend::Backend;
pub use pool::Pool;
