use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::error;

use crate::metrics::encode_metrics;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub feed: String,
    pub connected: bool,
}

/// Shared state for health endpoints
#[derive(Clone)]
pub struct ServerState {
    pub feed_name: String,
    pub connected: Arc<AtomicBool>,
}

impl ServerState {
    pub fn new(feed_name: impl Into<String>, connected: Arc<AtomicBool>) -> Self {
        Self {
            feed_name: feed_name.into(),
            connected,
        }
    }
}

/// Health endpoint - always returns 200 if server is running
async fn health(State(state): State<ServerState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        feed: state.feed_name.clone(),
        connected: state.connected.load(Ordering::SeqCst),
    })
}

/// Ready endpoint - returns 200 only once the feed is connected and subscribed
async fn ready(State(state): State<ServerState>) -> (StatusCode, Json<HealthResponse>) {
    let connected = state.connected.load(Ordering::SeqCst);
    let status_code = if connected {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(HealthResponse {
            status: if connected { "ready" } else { "not_ready" }.to_string(),
            feed: state.feed_name.clone(),
            connected,
        }),
    )
}

/// Prometheus text exposition
async fn metrics() -> impl IntoResponse {
    match encode_metrics() {
        Ok(body) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            body,
        ),
        Err(e) => {
            error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
                e.to_string(),
            )
        }
    }
}

/// Create the health server router
pub fn create_router(state: ServerState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Run the health server
pub async fn run_server(addr: SocketAddr, state: ServerState) -> std::io::Result<()> {
    let app = create_router(state);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::BridgeMetrics;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn create_test_state(connected: bool) -> ServerState {
        ServerState {
            feed_name: "test-feed".to_string(),
            connected: Arc::new(AtomicBool::new(connected)),
        }
    }

    #[tokio::test]
    async fn test_health_returns_ok() {
        let state = create_test_state(false);
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["feed"], "test-feed");
        assert_eq!(json["connected"], false);
    }

    #[tokio::test]
    async fn test_ready_when_connected() {
        let state = create_test_state(true);
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_when_disconnected() {
        let state = create_test_state(false);
        let app = create_router(state);

        let response = app
            .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_metrics_endpoint_exposes_bridge_counters() {
        BridgeMetrics::new("server-test-metrics").inc_published();
        let app = create_router(create_test_state(true));

        let response = app
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("pricefeed_bridge_records_published_total"));
        assert!(text.contains("server-test-metrics"));
    }
}
