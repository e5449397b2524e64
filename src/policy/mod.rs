//! Per-route policy engines.
//!
//! # Data Flow
//! ```text
//! Matched route → pipeline consults, in order:
//!     auth.rs           (api_key / basic)            denial → 401
//!     rate_limit.rs     (token bucket per path)      denial → 429
//!     circuit_breaker.rs (gate before forwarding)    open   → 503
//!     headers.rs        (request rewrite)
//!     cache.rs          (lookup; HIT short-circuits)
//!     ... forward ...
//!     circuit_breaker.rs (record per attempt)
//!     headers.rs        (response rewrite)
//!     cache.rs          (store 200s)
//! ```
//!
//! # Design Decisions
//! - Buckets, breaker states, and cache entries are keyed by route path
//!   and survive route-table replacements on purpose
//! - Each map sits behind one mutex; nothing is held across I/O
//! - The breaker gate and record are separate critical sections; a lost
//!   probe costs at most one extra failed attempt

pub mod auth;
pub mod cache;
pub mod circuit_breaker;
pub mod headers;
pub mod rate_limit;

pub use cache::ResponseCache;
pub use circuit_breaker::BreakerRegistry;
pub use rate_limit::RateLimiter;
