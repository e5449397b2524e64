//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → shared via Arc to all subsystems
//!
//! At startup the embedded route set is handed to AppState::apply_routes,
//! exactly as an admin-API caller would; a rejected route set leaves the
//! table empty and traffic falls back to the default pool.
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; runtime changes go through the admin
//!   API, never through file reloads
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::AdminConfig;
pub use schema::ListenerConfig;
pub use schema::ObservabilityConfig;
pub use schema::ProxyConfig;
pub use schema::ShutdownConfig;
