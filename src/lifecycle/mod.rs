//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → init logging/metrics → build state → apply routes
//!     → start admin + data listeners
//!
//! Shutdown:
//!     signals.rs (SIGTERM / ctrl-c) → shutdown.rs broadcast
//!     → listeners stop accepting → drain within the grace period
//!     → health supervisors cancelled
//! ```
//!
//! # Design Decisions
//! - Shutdown has a deadline: forced exit after the grace period
//! - Listeners start last (traffic only when ready)

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
