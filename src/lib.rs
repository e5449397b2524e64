//! GridPlane — a dynamically reconfigurable L7 reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────────────┐
//!                        │                     GRIDPLANE                      │
//!                        │                                                    │
//!   Client Request       │  ┌─────────┐    ┌──────────┐    ┌──────────────┐  │
//!   ────────────────────►│  │  http   │───►│ routing  │───►│ policy chain │  │
//!                        │  │ server  │    │  table   │    │ auth/rate/cb │  │
//!                        │  └─────────┘    └──────────┘    └──────┬───────┘  │
//!                        │                                        │          │
//!                        │                                        ▼          │
//!                        │                                ┌──────────────┐   │
//!                        │                                │load_balancer │   │
//!                        │                                │ pool+backend │   │
//!                        │                                └──────┬───────┘   │
//!                        │                                       │           │
//!   Client Response      │  ┌─────────┐    ┌──────────┐   ┌──────▼───────┐  │
//!   ◄────────────────────┼──│ cache / │◄───│ forward  │◄──│   backend    │◄─┼── Upstream
//!                        │  │ rewrite │    │ w/ retry │   │  forwarder   │  │
//!                        │  └─────────┘    └──────────┘   └──────────────┘  │
//!                        │                                                   │
//!                        │  ┌─────────────────────────────────────────────┐  │
//!                        │  │            Cross-Cutting Concerns           │  │
//!                        │  │  ┌────────┐ ┌────────┐ ┌──────────────────┐ │  │
//!                        │  │  │ config │ │ health │ │  observability   │ │  │
//!                        │  │  │        │ │ checks │ │  logs + metrics  │ │  │
//!                        │  │  └────────┘ └────────┘ └──────────────────┘ │  │
//!                        │  │  ┌─────────────────┐  ┌──────────────────┐  │  │
//!                        │  │  │      admin      │  │    lifecycle     │  │  │
//!                        │  │  │ routes/logs API │  │ signals/shutdown │  │  │
//!                        │  │  └─────────────────┘  └──────────────────┘  │  │
//!                        │  └─────────────────────────────────────────────┘  │
//!                        └───────────────────────────────────────────────────┘
//! ```
//!
//! The routing table is replaced atomically via the admin API; every request
//! takes a snapshot of the table at entry and never observes a partial
//! update. Rate-limit buckets, circuit-breaker states, and cache entries are
//! keyed by route path and deliberately survive table replacements, so a
//! re-published route keeps its budget and breaker state.

// Core subsystems
pub mod config;
pub mod http;
pub mod load_balancer;
pub mod policy;
pub mod routing;

// Traffic management
pub mod health;

// Cross-cutting concerns
pub mod admin;
pub mod lifecycle;
pub mod observability;

pub use crate::config::ProxyConfig;
pub use crate::http::server::AppState;
pub use crate::lifecycle::shutdown::Shutdown;

/// Product identifier sent to upstreams in the `X-Proxy-By` header.
pub const PRODUCT_NAME: &str = "GridPlane";
