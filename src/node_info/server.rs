//! Node-info HTTP server

use super::{CallerIpResponse, HealthResponse, NodeIpResponse, NodeTimeResponse};
use crate::config::NodeInfoSettings;
use crate::error::{Result, SwarmError};
use axum::{
    extract::{ConnectInfo, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::Utc;
use serde_json::json;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use tokio::net::{TcpListener, UdpSocket};
use tracing::{debug, error, info};

/// Handler failure, rendered as `{"message": ...}` with a 500 status
struct ApiError(String);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        error!("node-info request failed: {}", self.0);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "message": self.0 })),
        )
            .into_response()
    }
}

struct ServerState {
    probe_target: String,
}

/// Node-info HTTP server
pub struct NodeInfoServer {
    bind: String,
    state: Arc<ServerState>,
}

impl NodeInfoServer {
    pub fn new(settings: &NodeInfoSettings) -> Self {
        Self {
            bind: settings.bind.clone(),
            state: Arc::new(ServerState {
                probe_target: settings.probe_target.clone(),
            }),
        }
    }

    /// Routes of the service
    pub fn router(&self) -> Router {
        Router::new()
            .route("/health", get(health))
            .route("/get_node_ip", get(node_ip))
            .route("/get_caller_ip", get(caller_ip))
            .route("/get_node_time", get(node_time))
            .with_state(self.state.clone())
    }

    /// Bind the configured address and serve until the process ends
    pub async fn run(self) -> Result<()> {
        let listener = TcpListener::bind(&self.bind).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<()> {
        info!("Node-info service listening on {}", listener.local_addr()?);

        let app = self.router();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await?;

        Ok(())
    }
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
    })
}

async fn node_ip(
    State(state): State<Arc<ServerState>>,
) -> std::result::Result<Json<NodeIpResponse>, ApiError> {
    let ip = outbound_ip(&state.probe_target)
        .await
        .map_err(|e| ApiError(e.to_string()))?;
    Ok(Json(NodeIpResponse {
        node_ip: ip.to_string(),
    }))
}

async fn caller_ip(ConnectInfo(peer): ConnectInfo<SocketAddr>) -> Json<CallerIpResponse> {
    debug!("caller ip request from {}", peer);
    Json(CallerIpResponse {
        ip: peer.ip().to_string(),
    })
}

async fn node_time() -> std::result::Result<Json<NodeTimeResponse>, ApiError> {
    let time = Utc::now()
        .timestamp_nanos_opt()
        .ok_or_else(|| ApiError("clock out of range".to_string()))?;
    Ok(Json(NodeTimeResponse { time }))
}

/// Local address of the interface that routes toward `target`.
///
/// Connecting a UDP socket selects a route without sending anything.
pub async fn outbound_ip(target: &str) -> Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    socket.connect(target).await?;
    let local = socket.local_addr()?;

    if local.ip().is_unspecified() {
        return Err(SwarmError::NodeInfo(format!(
            "no route toward {}",
            target
        )));
    }
    Ok(local.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_outbound_ip_toward_loopback() {
        let ip = outbound_ip("127.0.0.1:9").await.unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn test_node_time_is_positive() {
        let Json(first) = node_time().await.ok().unwrap();
        assert!(first.time > 0);
    }
}
