//! Health check HTTP endpoint
//!
//! Consumed by the external watchdog and the deployment's health-check
//! aggregator. Readiness means the backing store answers a probe;
//! liveness only means the process is up.

use crate::store::AuthzBackend;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub store: StoreHealth,
    pub udp: UdpHealth,
}

#[derive(Debug, Clone, Serialize)]
pub struct UdpHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StoreHealth {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Clone)]
struct HealthState {
    backend: Arc<dyn AuthzBackend>,
}

impl HealthState {
    async fn check_store(&self) -> StoreHealth {
        match self.backend.health_check().await {
            Ok(()) => StoreHealth {
                status: "up".to_string(),
                error: None,
            },
            Err(e) => StoreHealth {
                status: "down".to_string(),
                error: Some(e.to_string()),
            },
        }
    }
}

/// Verify UDP networking still works by binding a throwaway socket.
/// The listener holds the real port, so this probes the stack, not
/// the service socket.
fn check_udp() -> UdpHealth {
    match std::net::UdpSocket::bind("127.0.0.1:0") {
        Ok(_) => UdpHealth {
            status: "up".to_string(),
            error: None,
        },
        Err(e) => UdpHealth {
            status: "down".to_string(),
            error: Some(e.to_string()),
        },
    }
}

async fn health_handler(State(state): State<HealthState>) -> Response {
    let store = state.check_store().await;
    let udp = check_udp();
    let healthy = store.status == "up" && udp.status == "up";

    let status = HealthStatus {
        status: if healthy { "healthy" } else { "unhealthy" }.to_string(),
        store,
        udp,
    };
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (code, Json(status)).into_response()
}

async fn ready_handler(State(state): State<HealthState>) -> Response {
    let store = state.check_store().await;
    if store.status == "up" {
        (StatusCode::OK, "ready").into_response()
    } else {
        (
            StatusCode::SERVICE_UNAVAILABLE,
            format!("store unavailable: {}", store.error.unwrap_or_default()),
        )
            .into_response()
    }
}

async fn live_handler() -> Response {
    (StatusCode::OK, "alive").into_response()
}

/// Build the health router
pub fn health_router(backend: Arc<dyn AuthzBackend>) -> Router {
    let state = HealthState { backend };

    Router::new()
        .route("/health", get(health_handler))
        .route("/health/ready", get(ready_handler))
        .route("/health/live", get(live_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the health endpoint on `addr`
pub async fn serve_health(
    backend: Arc<dyn AuthzBackend>,
    addr: std::net::SocketAddr,
) -> std::io::Result<()> {
    let app = health_router(backend);
    info!("Health endpoint listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await
}
