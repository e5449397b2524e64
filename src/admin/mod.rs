//! Admin API: the authenticated control plane.
//!
//! Exposes route-table management (`GetRoutes` / `UpdateRoutes`), the
//! metrics snapshot, and a live access-log stream. Every endpoint sits
//! behind the bearer-token middleware.

pub mod auth;
pub mod handlers;

use axum::routing::get;
use axum::{middleware, Router};

use crate::http::server::AppState;
use self::auth::require_bearer;
use self::handlers::*;

pub fn admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/routes", get(get_routes).put(update_routes))
        .route("/admin/metrics", get(get_metrics))
        .route("/admin/logs", get(stream_logs))
        .layer(middleware::from_fn_with_state(state.clone(), require_bearer))
        .with_state(state)
}
