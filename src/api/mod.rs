//! WebSocket push endpoint and HTTP status routes
//!
//! Every WebSocket connection becomes one registry subscriber and receives
//! one text frame per emitted snapshot.
//! Default port: 8765

use anyhow::{Context, Result};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        ConnectInfo, State,
    },
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::broadcast::{BroadcastStats, Broadcaster};

/// Default WebSocket port
pub const DEFAULT_PORT: u16 = 8765;

/// Shared state for API handlers
pub struct ApiState {
    pub broadcaster: Arc<Broadcaster>,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    #[serde(flatten)]
    stats: BroadcastStats,
}

/// Build the API router
pub fn build_router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/", get(snapshots_ws))
        .route("/ws", get(snapshots_ws))
        .route("/api/state", get(current_state))
        .route("/api/health", get(health_check))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// GET / and /ws - WebSocket snapshot stream
async fn snapshots_ws(
    ws: WebSocketUpgrade,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    State(state): State<Arc<ApiState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_websocket(socket, state, peer))
}

/// Forward snapshots to one WebSocket client until either side goes away
async fn handle_websocket(mut socket: WebSocket, state: Arc<ApiState>, peer: SocketAddr) {
    let registry = Arc::clone(state.broadcaster.registry());
    let mut subscriber = state.broadcaster.subscribe(peer.to_string());
    info!("Client {} connected ({} total)", peer, registry.len());

    loop {
        tokio::select! {
            line = subscriber.recv() => {
                match line {
                    Some(line) => {
                        if socket.send(Message::Text(line.to_string())).await.is_err() {
                            debug!("WebSocket client {} send failed", peer);
                            break;
                        }
                    }
                    None => {
                        // Dropped by the registry (shutdown)
                        let _ = socket.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
            result = socket.recv() => {
                match result {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client {} closed connection", peer);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {
                        // Push-only endpoint
                    }
                    Some(Err(e)) => {
                        warn!("WebSocket error from {}: {}", peer, e);
                        break;
                    }
                }
            }
        }
    }

    registry.leave(subscriber.id());
    info!("Client {} disconnected ({} total)", peer, registry.len());
}

/// GET /api/state - Latest snapshot, `null` before the first emission
async fn current_state(State(state): State<Arc<ApiState>>) -> impl IntoResponse {
    let body = state
        .broadcaster
        .latest()
        .map(|line| line.to_string())
        .unwrap_or_else(|| "null".to_string());
    ([(header::CONTENT_TYPE, "application/json")], body)
}

/// GET /api/health - Health check endpoint
async fn health_check(State(state): State<Arc<ApiState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        stats: state.broadcaster.stats(),
    })
}

/// Serve the API on an already bound listener until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<ApiState>, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = build_router(state);

    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown)
    .await
    .context("API server error")?;

    info!("API server stopped");
    Ok(())
}
