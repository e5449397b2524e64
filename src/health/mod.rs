//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! UpdateRoutes
//!     → checker.rs cancels every running supervisor
//!     → one supervisor per route with a health_check, plus one for the
//!       default pool
//!
//! Each supervisor, every interval:
//!     HEAD probe per backend → alive iff status ∈ [200, 500)
//!     → flips Backend.alive, logs the transition
//! ```
//!
//! # Design Decisions
//! - Probes use a dedicated client, not the forwarding pool
//! - A supervisor holds its pool's Arc, so probed backends outlive table
//!   swaps until the supervisor is cancelled
//! - Small start jitter avoids probing every pool in lockstep

pub mod checker;

pub use checker::HealthSupervisors;
