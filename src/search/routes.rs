//! HTTP + WebSocket endpoints for the search surface.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::{DateTime, Utc};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::WatchStream;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use super::model::{FlashcardPair, SearchState};
use super::searcher::FlashcardLookup;
use super::service::{SEARCH_FAILED_MESSAGE, SearchService};
use crate::error::ChannelError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub lookup: Arc<dyn FlashcardLookup>,
    /// Debounce window for WebSocket sessions.
    pub debounce: Duration,
}

/// Build the Axum router with the search routes.
pub fn search_routes(lookup: Arc<dyn FlashcardLookup>, debounce: Duration) -> Router {
    let state = AppState { lookup, debounce };

    Router::new()
        .route("/health", get(health))
        .route("/api/search", get(search))
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind `0.0.0.0:{port}` and serve until the listener fails.
pub async fn serve(app: Router, port: u16) -> crate::error::Result<()> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .map_err(|e| ChannelError::StartupFailed {
            name: "http".to_string(),
            reason: e.to_string(),
        })?;
    info!(port, "Search server started");
    axum::serve(listener, app).await.map_err(ChannelError::Io)?;
    Ok(())
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "quizbase"
    }))
}

// ── One-shot search ─────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

#[derive(Debug, Serialize)]
struct SearchResponse {
    result: Option<FlashcardPair>,
    error: Option<String>,
    answered_at: DateTime<Utc>,
}

async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let query = params.q;
    if query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(serde_json::json!({ "error": "Missing query parameter 'q'" })),
        );
    }

    info!(query = %query, "One-shot search");
    let (status, result, error) = match state.lookup.lookup(&query).await {
        Ok(result) => (StatusCode::OK, result, None),
        Err(e) => {
            error!(error = %e, "Search error");
            (
                StatusCode::BAD_GATEWAY,
                None,
                Some(SEARCH_FAILED_MESSAGE.to_string()),
            )
        }
    };

    let body = SearchResponse {
        result,
        error,
        answered_at: Utc::now(),
    };
    match serde_json::to_value(&body) {
        Ok(json) => (status, Json(json)),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "error": e.to_string() })),
        ),
    }
}

// ── WebSocket ───────────────────────────────────────────────────────────

/// Message from client → server.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    /// The current input value, sent on every keystroke.
    Query { text: String },
}

/// Message from server → client.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ServerMessage {
    State(SearchState),
    Error { message: String },
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    info!("WebSocket client connecting");
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(mut socket: WebSocket, state: AppState) {
    info!("WebSocket client connected");

    let service = SearchService::new(Arc::clone(&state.lookup), state.debounce);
    let mut updates = WatchStream::new(service.subscribe());

    loop {
        tokio::select! {
            update = updates.next() => {
                let Some(update) = update else { break };
                if send_json(&mut socket, &ServerMessage::State(update)).await.is_err() {
                    debug!("Client disconnected during send");
                    break;
                }
            }
            incoming = socket.recv() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Query { text }) => service.set_query(text),
                            Err(e) => {
                                warn!(error = %e, "Invalid client message");
                                let msg = ServerMessage::Error {
                                    message: ChannelError::InvalidMessage(e.to_string()).to_string(),
                                };
                                if send_json(&mut socket, &msg).await.is_err() {
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("Client closed connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    info!("WebSocket client disconnected");
}

async fn send_json(socket: &mut WebSocket, msg: &ServerMessage) -> Result<(), axum::Error> {
    match serde_json::to_string(msg) {
        Ok(json) => socket.send(Message::Text(json.into())).await,
        Err(e) => {
            error!(error = %e, "Failed to serialize server message");
            Ok(())
        }
    }
}
