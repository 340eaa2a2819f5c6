//! Lobby message handlers
//!
//! Join, leave, readiness, bots, start, reset and chat.

use super::handlers::{reject, requester};
use super::Session;
use crate::error::RoomError;
use crate::protocol::{JoinPlayer, ServerMessage};
use crate::state::AppState;
use crate::types::{ChatMessage, PlayerId, RoomCode};

pub async fn handle_join(
    state: &AppState,
    session: &mut Session,
    room_code: RoomCode,
    player: JoinPlayer,
) -> Option<ServerMessage> {
    tracing::info!("Join request: {} -> room {}", player.id, room_code);

    let player_id = player.id.trim().to_string();

    // One connection plays one seat. The previous seat is only given up once
    // the new join has been accepted.
    let previous = match (&session.room, &session.player_id) {
        (Some(code), Some(old_id)) if !(*code == room_code && *old_id == player_id) => {
            Some((code.clone(), old_id.clone()))
        }
        _ => None,
    };

    let rx = match state.join_as(&room_code, player, session.connection).await {
        Ok(rx) => rx,
        Err(e) => return reject("join-lobby", e),
    };

    if let Some((code, old_id)) = previous {
        if let Err(e) = state.leave_as(&code, &old_id, session.connection).await {
            tracing::debug!("Leaving room {} after switching skipped: {}", code, e);
        }
    }
    session.bind(room_code, player_id, rx);
    None
}

pub async fn handle_leave(
    state: &AppState,
    session: &mut Session,
    room_code: RoomCode,
    player_id: PlayerId,
) -> Option<ServerMessage> {
    let me = match requester(session, &room_code) {
        Ok(me) if me == player_id => me.to_string(),
        Ok(_) => return reject("leave-lobby", RoomError::UnknownPlayer),
        Err(e) => return reject("leave-lobby", e),
    };

    tracing::info!("Player {} leaving room {}", me, room_code);
    session.clear();
    match state.leave_as(&room_code, &me, session.connection).await {
        Ok(_) => None,
        Err(e) => reject("leave-lobby", e),
    }
}

pub async fn handle_ready(
    state: &AppState,
    session: &Session,
    room_code: RoomCode,
    player_id: PlayerId,
    is_ready: bool,
) -> Option<ServerMessage> {
    let result = match requester(session, &room_code) {
        Ok(me) if me == player_id => state.set_ready(&room_code, me, is_ready).await,
        Ok(_) => Err(RoomError::UnknownPlayer),
        Err(e) => Err(e),
    };
    result.err().and_then(|e| reject("player-ready", e))
}

pub async fn handle_toggle_bots(
    state: &AppState,
    session: &Session,
    room_code: RoomCode,
) -> Option<ServerMessage> {
    let result = match requester(session, &room_code) {
        Ok(me) => state.toggle_bots(&room_code, me).await,
        Err(e) => Err(e),
    };
    result.err().and_then(|e| reject("toggle-bots", e))
}

pub async fn handle_start_game(
    state: &AppState,
    session: &Session,
    room_code: RoomCode,
) -> Option<ServerMessage> {
    let result = match requester(session, &room_code) {
        Ok(me) => {
            tracing::info!("Start requested by {} in room {}", me, room_code);
            state.start_game(&room_code, me).await
        }
        Err(e) => Err(e),
    };
    result.err().and_then(|e| reject("start-game", e))
}

pub async fn handle_reset_game(
    state: &AppState,
    session: &Session,
    room_code: RoomCode,
) -> Option<ServerMessage> {
    let result = match requester(session, &room_code) {
        Ok(me) => state.reset_game(&room_code, me).await,
        Err(e) => Err(e),
    };
    result.err().and_then(|e| reject("reset-game", e))
}

pub async fn handle_chat(
    state: &AppState,
    session: &Session,
    room_code: RoomCode,
    mut message: ChatMessage,
) -> Option<ServerMessage> {
    if message.id.is_empty() {
        message.id = ulid::Ulid::new().to_string();
    }
    if message.timestamp == 0 {
        message.timestamp = chrono::Utc::now().timestamp_millis();
    }

    let result = match requester(session, &room_code) {
        Ok(me) => state.chat(&room_code, me, message).await,
        Err(e) => Err(e),
    };
    result.err().and_then(|e| reject("chat-message", e))
}
