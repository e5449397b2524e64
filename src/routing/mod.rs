//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Admin API / startup config
//!     → route.rs (ConfigRoute wire schema, compiled Route + pools)
//!     → router.rs (RouteTable: sorted slice, atomic replacement)
//!
//! Per request:
//!     router.rs snapshot → first match wins (ascending priority)
//!     → matcher.rs (method set, glob/prefix path, rule conditions)
//! ```
//!
//! # Design Decisions
//! - Routes are immutable once installed; reconfiguration replaces the
//!   whole table under an exclusive lock
//! - Readers snapshot the table at request entry and hold no lock while
//!   forwarding
//! - Path matching is glob-first with a prefix fallback; no regex engine

pub mod matcher;
pub mod route;
pub mod router;

pub use route::{ConfigRoute, Route};
pub use router::RouteTable;
