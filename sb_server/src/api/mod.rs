//! HTTP/WebSocket API for the table server.
//!
//! # Endpoints Overview
//!
//! - `GET /ws` - Establish the game WebSocket. Every connection starts as a
//!   spectator and takes a seat with a `join_seat` or `rejoin` message.
//! - `GET /health` - Server and table health status
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use sb_server::api::{create_router, AppState};
//! use setback::{TableActor, TableConfig};
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let config = TableConfig::default();
//! let outbound_capacity = config.outbound_capacity;
//! let (actor, table) = TableActor::new(config);
//! tokio::spawn(actor.run());
//!
//! let app = create_router(AppState { table, outbound_capacity });
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use serde_json::json;
use setback::TableHandle;
use std::time::Duration;
use tower_http::cors::CorsLayer;

/// How long `/health` waits for the table actor before reporting it unhealthy
const HEALTH_TIMEOUT: Duration = Duration::from_secs(2);

/// Application state shared across all HTTP handlers and WebSocket connections.
///
/// Cloned for each request; the table handle is a channel sender plus a
/// shared registry.
#[derive(Clone)]
pub struct AppState {
    pub table: TableHandle,
    /// Capacity of each connection's outbound queue
    pub outbound_capacity: usize,
}

/// Create the API router with all endpoints and middleware.
///
/// ```text
/// GET  /health   - Health check
/// GET  /ws       - Game WebSocket
/// ```
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// Asks the table actor for a summary. Returns `200 OK` with the table's
/// phase and occupancy, or `503 Service Unavailable` if the actor has stopped
/// or doesn't answer in time.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"3.0.1","table":{"phase":"lobby",...},"timestamp":"..."}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let summary = tokio::time::timeout(HEALTH_TIMEOUT, state.table.summary())
        .await
        .ok()
        .and_then(Result::ok);

    let response = match &summary {
        Some(summary) => json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "table": {
                "name": summary.name,
                "phase": summary.phase,
                "connections": summary.connections,
                "seated": summary.seated,
                "scores": summary.scores,
                "games_won": summary.games_won,
                "target_score": summary.target_score,
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
        None => json!({
            "status": "unhealthy",
            "version": env!("CARGO_PKG_VERSION"),
            "table": null,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        }),
    };

    let status_code = if summary.is_some() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
