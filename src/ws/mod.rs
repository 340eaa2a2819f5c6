pub mod handlers;
mod lobby;
mod round;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::sync::broadcast::{self, error::RecvError};

use crate::broadcast::Envelope;
use crate::protocol::{ClientMessage, ServerMessage, PROTOCOL_VERSION};
use crate::state::AppState;
use crate::types::{ConnectionId, PlayerId, RoomCode};

/// What one connection is bound to: zero or one room, as one player
pub struct Session {
    /// Fixed for the connection's lifetime
    pub connection: ConnectionId,
    pub room: Option<RoomCode>,
    pub player_id: Option<PlayerId>,
    pub rx: Option<broadcast::Receiver<Envelope>>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            connection: ConnectionId::new(),
            room: None,
            player_id: None,
            rx: None,
        }
    }

    pub fn is_in(&self, code: &RoomCode) -> bool {
        self.room.as_ref() == Some(code)
    }

    pub fn bind(&mut self, code: RoomCode, player_id: PlayerId, rx: broadcast::Receiver<Envelope>) {
        self.room = Some(code);
        self.player_id = Some(player_id);
        self.rx = Some(rx);
    }

    pub fn clear(&mut self) {
        self.room = None;
        self.player_id = None;
        self.rx = None;
    }
}

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let mut session = Session::new();

    tracing::info!("WebSocket connected: {}", session.connection);

    let welcome = ServerMessage::Welcome {
        protocol: PROTOCOL_VERSION.to_string(),
        server_now: chrono::Utc::now().to_rfc3339(),
    };
    if !send(&mut sender, &welcome).await {
        tracing::error!("Failed to send welcome message");
        return;
    }

    loop {
        tokio::select! {
            // Room broadcasts (only once joined)
            room_msg = recv_room(&mut session.rx) => {
                match room_msg {
                    Ok(envelope) => {
                        if envelope.is_for(session.player_id.as_deref())
                            && !send(&mut sender, &envelope.message).await
                        {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("Connection lagged by {} messages, resyncing", skipped);
                        if !resync(&mut sender, &session, &state).await {
                            break;
                        }
                    }
                    Err(RecvError::Closed) => {
                        // Room was discarded
                        session.rx = None;
                    }
                }
            }

            // Handle client messages
            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(client_msg) => {
                                if let Some(response) =
                                    handlers::handle_message(client_msg, &mut session, &state).await
                                {
                                    if !send(&mut sender, &response).await {
                                        tracing::error!("Failed to send response");
                                        break;
                                    }
                                }
                            }
                            Err(e) => {
                                // Malformed payloads are dropped like any other rejected action
                                tracing::debug!("Failed to parse client message: {}", e);
                                let error = ServerMessage::LobbyError {
                                    code: "INVALID_MESSAGE".to_string(),
                                    message: format!("Invalid message format: {}", e),
                                };
                                let _ = send(&mut sender, &error).await;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::warn!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    disconnect(&state, &mut session).await;
    tracing::info!("WebSocket connection closed");
}

/// Connection loss takes the same path as an explicit leave, unless a newer
/// connection has re-joined as the same player in the meantime
pub async fn disconnect(state: &AppState, session: &mut Session) {
    let (Some(code), Some(player_id)) = (session.room.take(), session.player_id.take()) else {
        return;
    };
    session.rx = None;

    tracing::info!("Player {} disconnected from room {}", player_id, code);
    if let Err(e) = state.leave_as(&code, &player_id, session.connection).await {
        tracing::debug!("Leave on disconnect for {} skipped: {}", player_id, e);
    }
}

/// Next room broadcast, or wait forever while not in a room
async fn recv_room(
    rx: &mut Option<broadcast::Receiver<Envelope>>,
) -> Result<Envelope, RecvError> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn resync(
    sender: &mut SplitSink<WebSocket, Message>,
    session: &Session,
    state: &AppState,
) -> bool {
    let Some(code) = &session.room else {
        return true;
    };
    let Some(messages) = state.snapshot(code, session.player_id.as_deref()).await else {
        return true;
    };
    for message in &messages {
        if !send(sender, message).await {
            return false;
        }
    }
    true
}

async fn send(sender: &mut SplitSink<WebSocket, Message>, msg: &ServerMessage) -> bool {
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await.is_ok(),
        Err(e) => {
            tracing::error!("Failed to serialize message: {}", e);
            true
        }
    }
}
