//! ==============================================================================
//! server.rs - dashboard web server
//! ==============================================================================
//!
//! purpose:
//!     the browser side of the dashboard. the event loop renders into a
//!     BroadcastDashboard, which fans frames out to every connected client.
//!
//! routes:
//!     GET  /              dashboard page (chart + status + servo buttons)
//!     GET  /ws            websocket, `{"event": .., "data": ..}` messages
//!     GET  /api/snapshot  latest frame and status as json
//!     POST /api/command   ?angle=<n>, fire-and-forget servo command
//!
//! relationships:
//!     - implements: adapter.rs Dashboard (BroadcastDashboard)
//!     - feeds: main.rs event loop (HostEvent::Command / Client*)
//!
//! ==============================================================================

use anyhow::Result;
use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::{Query, State},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use futures::stream::SplitSink;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tower_http::cors::CorsLayer;

use crate::adapter::Dashboard;
use crate::domain::{
    ClientMessage, DashboardFrame, HostEvent, RedrawMode, ServerMessage, ServoCommand, StatusText,
};
use crate::window::WindowSnapshot;

const DASHBOARD_HTML: &str = include_str!("../static/index.html");

/// frames buffered per client before a slow client starts skipping
pub const CLIENT_BUFFER: usize = 64;

/// what a client joining now should see
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LatestView {
    pub frame: DashboardFrame,
    pub status: StatusText,
}

// ==============================================================================
// dashboard sink
// ==============================================================================

/// Dashboard implementation that publishes to websocket clients.
///
/// live updates go through a broadcast channel; the most recent frame and
/// status are also kept in a watch channel for late joiners and the api.
pub struct BroadcastDashboard {
    updates: broadcast::Sender<ServerMessage>,
    latest: watch::Sender<LatestView>,
}

impl BroadcastDashboard {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(CLIENT_BUFFER);
        let (latest, _) = watch::channel(LatestView::default());
        Self { updates, latest }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.updates.subscribe()
    }

    pub fn latest(&self) -> watch::Receiver<LatestView> {
        self.latest.subscribe()
    }

    pub fn updates(&self) -> broadcast::Sender<ServerMessage> {
        self.updates.clone()
    }

    fn publish(&self, message: ServerMessage) {
        // no subscribers is fine, nobody is watching yet
        let _ = self.updates.send(message);
    }
}

impl Default for BroadcastDashboard {
    fn default() -> Self {
        Self::new()
    }
}

impl Dashboard for BroadcastDashboard {
    fn redraw(&mut self, snapshot: WindowSnapshot, mode: RedrawMode) {
        let frame = DashboardFrame::new(snapshot, mode);
        self.latest.send_modify(|view| view.frame = frame.clone());
        self.publish(ServerMessage::Frame(frame));
    }

    fn show_status(&mut self, status: StatusText) {
        self.latest.send_modify(|view| view.status = status.clone());
        self.publish(ServerMessage::Status(status));
    }
}

// ==============================================================================
// web server
// ==============================================================================

/// handles shared by all requests
#[derive(Clone)]
pub struct AppState {
    pub events: mpsc::Sender<HostEvent>,
    pub updates: broadcast::Sender<ServerMessage>,
    pub latest: watch::Receiver<LatestView>,
}

impl AppState {
    pub fn new(events: mpsc::Sender<HostEvent>, dashboard: &BroadcastDashboard) -> Self {
        Self {
            events,
            updates: dashboard.updates(),
            latest: dashboard.latest(),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(dashboard_handler))
        .route("/ws", get(ws_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/api/command", post(command_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn run_server(addr: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn dashboard_handler() -> Html<&'static str> {
    Html(DASHBOARD_HTML)
}

/// json api endpoint for programmatic access
async fn snapshot_handler(State(state): State<AppState>) -> Json<LatestView> {
    let view = state.latest.borrow().clone();
    Json(view)
}

/// servo command params
#[derive(Deserialize)]
struct CommandParams {
    angle: f64,
}

/// POST /api/command?angle=180
///
/// the command is queued for the event loop; "ok" does not mean the
/// device received it.
async fn command_handler(
    State(state): State<AppState>,
    Query(params): Query<CommandParams>,
) -> Json<serde_json::Value> {
    if !params.angle.is_finite() {
        return Json(serde_json::json!({"status": "error", "message": "angle must be a finite number"}));
    }
    let command = ServoCommand { angle: params.angle };
    match state.events.send(HostEvent::Command(command)).await {
        Ok(()) => Json(serde_json::json!({"status": "ok", "angle": params.angle})),
        Err(_) => Json(serde_json::json!({"status": "error", "message": "event loop stopped"})),
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| client_session(socket, state))
        .into_response()
}

async fn send_message(
    sink: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<()> {
    let text = serde_json::to_string(message)?;
    sink.send(Message::Text(text)).await?;
    Ok(())
}

/// one websocket client, from greeting to close
async fn client_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    // subscribe before reading `latest` so no frame falls in between
    let mut updates = state.updates.subscribe();
    let _ = state.events.send(HostEvent::ClientConnected).await;

    let latest = state.latest.borrow().clone();
    let greeting = [
        ServerMessage::Connected { msg: "OK".to_string() },
        ServerMessage::Frame(latest.frame),
        ServerMessage::Status(latest.status),
    ];
    for message in &greeting {
        if let Err(e) = send_message(&mut sink, message).await {
            tracing::debug!("[WS] greeting failed: {}", e);
            let _ = state.events.send(HostEvent::ClientDisconnected).await;
            return;
        }
    }

    let mut send_task = tokio::spawn(async move {
        loop {
            match updates.recv().await {
                Ok(message) => {
                    if send_message(&mut sink, &message).await.is_err() {
                        break;
                    }
                }
                // every frame is a full snapshot, the next one catches up
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("[WS] slow client skipped {} updates", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    let events = state.events.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(message)) = stream.next().await {
            match message {
                Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(ClientMessage::Command(command)) if command.angle.is_finite() => {
                        if events.send(HostEvent::Command(command)).await.is_err() {
                            break;
                        }
                    }
                    Ok(ClientMessage::Command(command)) => {
                        tracing::debug!("[WS] ignored non-finite angle {}", command.angle);
                    }
                    Err(e) => tracing::debug!("[WS] ignored message {:?}: {}", text, e),
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let _ = state.events.send(HostEvent::ClientDisconnected).await;
}
