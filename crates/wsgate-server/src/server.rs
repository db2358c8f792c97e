//! The relay server: one listener serving the WebSocket upgrade, the push
//! endpoint handlers call back into, and the health/debug routes.

use std::sync::Arc;

use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use tower_http::cors::CorsLayer;

use wsgate_core::frames::ConnectionAck;
use wsgate_core::invoke::Invoker;
use wsgate_core::ConnectionId;

use crate::connection;
use crate::forwarder::{EventForwarder, RouteTable};
use crate::registry::ConnectionRegistry;

/// Server configuration.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub max_send_queue: usize,
    pub routes: RouteTable,
    pub domain_name: String,
    pub stage: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            max_send_queue: 256,
            routes: RouteTable::default(),
            domain_name: "localhost".into(),
            stage: "local".into(),
        }
    }
}

/// Shared state passed to axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<ConnectionRegistry>,
    pub forwarder: Arc<EventForwarder>,
}

/// Query parameters accepted on the upgrade request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConnectParams {
    /// Forced identifier for reproducible local testing.
    connection_id: Option<String>,
    /// Opaque auth token, passed through to the connect handler.
    token: Option<String>,
}

/// Build the router with all routes. The upgrade is served both at the root
/// (where browser clients connect) and at `/ws`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(ws_handler))
        .route("/ws", get(ws_handler))
        .route("/@connections/{id}", post(push_handler))
        .route("/healthz", get(healthz_handler))
        .route("/clients", get(clients_handler))
        .with_state(state)
        .layer(CorsLayer::permissive())
}

/// Create and start the server. Returns a handle exposing the bound port.
pub async fn start(
    config: ServerConfig,
    invoker: Arc<dyn Invoker>,
) -> Result<ServerHandle, std::io::Error> {
    let registry = Arc::new(ConnectionRegistry::new(config.max_send_queue));
    let forwarder = Arc::new(EventForwarder::new(
        invoker,
        config.routes.clone(),
        config.domain_name.clone(),
        config.stage.clone(),
    ));

    let state = AppState { registry, forwarder };
    let router = build_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    tracing::info!(port = local_addr.port(), "local WebSocket gateway listening");

    let server = tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });

    Ok(ServerHandle {
        port: local_addr.port(),
        _server: server,
    })
}

/// Keeps the serve task alive for the process lifetime.
pub struct ServerHandle {
    pub port: u16,
    _server: tokio::task::JoinHandle<()>,
}

/// WebSocket upgrade handler.
async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    let id = params
        .connection_id
        .map(ConnectionId::from_raw)
        .unwrap_or_else(ConnectionId::generate);
    let token = params.token;
    ws.on_upgrade(move |socket| handle_socket(socket, id, token, state))
}

/// Accept sequence: register, notify the connect handler without blocking,
/// ack, then hand the socket to its pumps.
async fn handle_socket(
    socket: WebSocket,
    id: ConnectionId,
    token: Option<String>,
    state: AppState,
) {
    let (conn, rx) = state.registry.register(id.clone());
    tracing::info!(
        connection_id = %id,
        has_token = token.is_some(),
        "client connected"
    );

    // Fire-and-forget: the ack below does not wait on this.
    let connect_forwarder = Arc::clone(&state.forwarder);
    let connect_event = state.forwarder.connect_event(&id, token.as_deref());
    tokio::spawn(async move {
        if let Err(e) = connect_forwarder.forward(connect_event).await {
            tracing::error!(error = %e, kind = e.error_kind(), "connect handler failed");
        }
    });

    // Ack immediately so the client learns its identifier.
    let ack = ConnectionAck {
        connection_id: id.clone(),
    };
    if let Ok(json) = serde_json::to_string(&ack) {
        let _ = conn.enqueue(json);
    }

    connection::run(
        socket,
        conn,
        rx,
        Arc::clone(&state.registry),
        Arc::clone(&state.forwarder),
    )
    .await;
}

/// `POST /@connections/{id}`: push an arbitrary JSON payload down the
/// matching socket. 200 on delivery, 404 when there is no live writable
/// connection. At-most-once, no retry.
async fn push_handler(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(body): Json<serde_json::Value>,
) -> StatusCode {
    let id = ConnectionId::from_raw(id);
    match state.registry.send_to(&id, body.to_string()) {
        Ok(()) => {
            tracing::info!(connection_id = %id, "pushed payload to client");
            StatusCode::OK
        }
        Err(e) => {
            tracing::warn!(
                connection_id = %id,
                kind = e.error_kind(),
                known = ?state.registry.connection_ids(),
                "no active client for push"
            );
            StatusCode::NOT_FOUND
        }
    }
}

async fn healthz_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "ok": true }))
}

/// Debug listing of currently registered connection identifiers.
async fn clients_handler(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "clients": state.registry.connection_ids() }))
}
