//! Admin API handlers.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use serde::Serialize;
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::warn;

use crate::http::server::AppState;
use crate::observability::metrics::MetricsSnapshot;
use crate::routing::route::ConfigRoute;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct ApplyResult {
    pub status: &'static str,
    pub count: usize,
}

pub async fn get_status() -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
    })
}

/// Echo the active route table with current targets and weights.
pub async fn get_routes(State(state): State<AppState>) -> Json<Vec<ConfigRoute>> {
    Json(state.table.current_config())
}

/// Atomically replace the route table. A rejected set leaves the active
/// table untouched.
pub async fn update_routes(
    State(state): State<AppState>,
    Json(routes): Json<Vec<ConfigRoute>>,
) -> Result<Json<ApplyResult>, (StatusCode, String)> {
    match state.apply_routes(routes) {
        Ok(count) => Ok(Json(ApplyResult {
            status: "applied",
            count,
        })),
        Err(error) => {
            warn!(error = %error, "route update rejected");
            Err((StatusCode::UNPROCESSABLE_ENTITY, error.to_string()))
        }
    }
}

pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Stream access logs as server-sent events. Slow consumers lag and lose
/// records; they never stall the data plane.
pub async fn stream_logs(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let stream = BroadcastStream::new(state.logs.subscribe())
        .filter_map(|entry| entry.ok())
        .map(|entry| Event::default().json_data(&entry));

    Sse::new(stream).keep_alive(KeepAlive::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyConfig;
    use crate::routing::route::Algorithm;
    use axum::body::Body;
    use axum::http::{header, Method, Request};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn state_with_key(key: &str) -> AppState {
        let mut config = ProxyConfig::default();
        config.admin.api_key = key.to_string();
        AppState::new(config).unwrap()
    }

    fn route_json(path: &str, target: &str) -> serde_json::Value {
        serde_json::json!({
            "path": path,
            "methods": [],
            "priority": 5,
            "targets": [target],
        })
    }

    async fn request(
        app: &axum::Router,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<serde_json::Value>,
    ) -> axum::response::Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&json).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        app.clone().oneshot(request).await.unwrap()
    }

    #[tokio::test]
    async fn test_rejects_missing_or_wrong_token() {
        let state = state_with_key("right");
        let app = crate::admin::admin_router(state);

        let response = request(&app, Method::GET, "/admin/status", None, None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = request(&app, Method::GET, "/admin/status", Some("wrong"), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_status_with_token() {
        let state = state_with_key("k");
        let app = crate::admin::admin_router(state);

        let response = request(&app, Method::GET, "/admin/status", Some("k"), None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "operational");
    }

    #[tokio::test]
    async fn test_update_and_get_routes_round_trip() {
        let state = state_with_key("k");
        let app = crate::admin::admin_router(state);

        let payload = serde_json::json!([route_json("/api/*", "http://127.0.0.1:9001")]);
        let response = request(
            &app,
            Method::PUT,
            "/admin/routes",
            Some("k"),
            Some(payload),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = request(&app, Method::GET, "/admin/routes", Some("k"), None).await;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let routes: Vec<ConfigRoute> = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].path, "/api/*");
        assert_eq!(routes[0].priority, 5);
        assert_eq!(routes[0].algorithm, Algorithm::RoundRobin);
        assert_eq!(routes[0].targets, vec!["http://127.0.0.1:9001".to_string()]);
        assert!(routes[0].weights.is_some());
    }

    #[tokio::test]
    async fn test_invalid_target_is_unprocessable() {
        let state = state_with_key("k");
        let app = crate::admin::admin_router(state);

        let payload = serde_json::json!([route_json("/bad", "no scheme here")]);
        let response = request(
            &app,
            Method::PUT,
            "/admin/routes",
            Some("k"),
            Some(payload),
        )
        .await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn test_metrics_snapshot() {
        let state = state_with_key("k");
        state.metrics.request_started();
        let app = crate::admin::admin_router(state);

        let response = request(&app, Method::GET, "/admin/metrics", Some("k"), None).await;
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["total_requests"], 1);
        assert_eq!(json["active_connections"], 1);
    }
}
