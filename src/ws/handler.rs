//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::session::SessionDriver;
use crate::util::rate_limit::ControlRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Seed for the session's defense generator
    pub seed: Option<u64>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Response {
    let seed = query
        .seed
        .or(state.config.defense_seed)
        .unwrap_or_else(rand::random);
    ws.on_upgrade(move |socket| handle_socket(socket, seed, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, seed: u64, state: AppState) {
    let session_id = Uuid::new_v4();
    info!(session_id = %session_id, seed, "New WebSocket connection");

    let (mut ws_sink, ws_stream) = socket.split();

    let welcome = ServerMsg::Welcome {
        session_id,
        server_time: unix_millis(),
    };

    if let Err(e) = send_msg(&mut ws_sink, &welcome).await {
        error!(session_id = %session_id, error = %e, "Failed to send welcome");
        return;
    }

    // Subscribe before the loop starts so the initial setup is not missed
    let (driver, handle) = SessionDriver::new(session_id, seed);
    let events_rx = handle.subscribe();
    let control_tx = handle.control_tx.clone();
    state.sessions.insert(handle);
    tokio::spawn(driver.run());

    run_session(session_id, ws_sink, ws_stream, control_tx, events_rx).await;

    // Dropping the registry's handle closes the control channel, ending the loop
    state.sessions.remove(&session_id);

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session_id: Uuid,
    mut ws_sink: futures::stream::SplitSink<WebSocket, Message>,
    mut ws_stream: futures::stream::SplitStream<WebSocket>,
    control_tx: mpsc::Sender<ClientMsg>,
    mut events_rx: broadcast::Receiver<ServerMsg>,
) {
    let rate_limiter = ControlRateLimiter::new();

    // Spawn writer task: session events -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match events_rx.recv().await {
                Ok(msg) => {
                    if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                        debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        session_id = %session_id,
                        lagged_count = n,
                        "Client lagged, skipping {} frames", n
                    );
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session_id = %session_id, "Event channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> session loop
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check() {
                    warn!(session_id = %session_id, "Rate limited control message");
                    continue;
                }

                match serde_json::from_str::<ClientMsg>(&text) {
                    Ok(msg) => {
                        if control_tx.send(msg).await.is_err() {
                            debug!(session_id = %session_id, "Control channel closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    writer_handle.abort();
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
