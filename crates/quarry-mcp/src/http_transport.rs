//! HTTP transport for MCP server.
//!
//! JSON-RPC is POSTed to `/mcp`. `initialize` opens a session and returns
//! its id in the `Mcp-Session-Id` header; later requests must echo it.
//! `DELETE /mcp` ends the session.

use crate::error::McpError;
use crate::protocol::{INVALID_REQUEST, JsonRpcRequest, JsonRpcResponse};
use crate::server::McpServer;
use crate::session::SessionStore;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Header carrying the session id.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// HTTP transport handler state.
pub struct HttpTransportState {
    server: Arc<McpServer>,
    sessions: SessionStore,
}

impl HttpTransportState {
    /// Create a new HTTP transport state.
    /// Session limits come from the server's MCP configuration.
    pub fn new(server: Arc<McpServer>) -> Self {
        let sessions = SessionStore::from(server.config());
        Self { server, sessions }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }
}

/// Create the HTTP router for MCP.
pub fn create_router(state: Arc<HttpTransportState>) -> Router {
    Router::new()
        .route("/mcp", post(handle_mcp_post).delete(handle_mcp_delete))
        .route("/health", get(handle_health))
        .with_state(state)
}

fn session_id(headers: &HeaderMap) -> Option<&str> {
    headers.get(SESSION_HEADER).and_then(|v| v.to_str().ok())
}

/// Handle POST requests to /mcp (JSON-RPC over HTTP).
async fn handle_mcp_post(
    State(state): State<Arc<HttpTransportState>>,
    headers: HeaderMap,
    Json(request): Json<JsonRpcRequest>,
) -> Response {
    if request.method == "initialize" {
        let (id, session) = state.sessions.create();
        let response = state.server.handle_request(request, &session).await;
        info!(sessions = state.sessions.len(), "Opened MCP session");
        return ([(SESSION_HEADER, id)], Json(response)).into_response();
    }

    let Some(id) = session_id(&headers) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(JsonRpcResponse::error(
                request.id,
                INVALID_REQUEST,
                "Missing Mcp-Session-Id header",
            )),
        )
            .into_response();
    };
    let Some(session) = state.sessions.get(id) else {
        return (
            StatusCode::NOT_FOUND,
            Json(JsonRpcResponse::error(request.id, INVALID_REQUEST, "Unknown session")),
        )
            .into_response();
    };

    if request.is_notification() {
        state.server.handle_request(request, &session).await;
        return StatusCode::ACCEPTED.into_response();
    }

    let response = state.server.handle_request(request, &session).await;
    (StatusCode::OK, Json(response)).into_response()
}

/// Handle DELETE requests to /mcp (end of session).
async fn handle_mcp_delete(
    State(state): State<Arc<HttpTransportState>>,
    headers: HeaderMap,
) -> StatusCode {
    match session_id(&headers) {
        Some(id) if state.sessions.remove(id) => {
            info!(sessions = state.sessions.len(), "Closed MCP session");
            StatusCode::NO_CONTENT
        }
        Some(_) => StatusCode::NOT_FOUND,
        None => StatusCode::BAD_REQUEST,
    }
}

/// Handle health check requests.
async fn handle_health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "quarry-mcp",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// HTTP server for MCP transport.
pub struct HttpServer {
    addr: String,
    state: Arc<HttpTransportState>,
}

impl HttpServer {
    /// Create a new HTTP server.
    pub fn new(server: Arc<McpServer>, addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            state: Arc::new(HttpTransportState::new(server)),
        }
    }

    /// Run the HTTP server until Ctrl-C.
    pub async fn run(self) -> Result<(), McpError> {
        let app = create_router(self.state).layer(TraceLayer::new_for_http());
        let addr = self.addr;

        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| McpError::StartupFailed(format!("Failed to bind to {}: {}", addr, e)))?;

        info!(addr = %addr, "MCP HTTP server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = tokio::signal::ctrl_c().await;
                info!("Shutdown signal received");
            })
            .await
            .map_err(|e| McpError::Internal(e.into()))?;

        Ok(())
    }
}
