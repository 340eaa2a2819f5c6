//! WebSocket message dispatch
//!
//! Routes client events to the lobby or round handlers. Every rejection is
//! recovered here and answered to the requester only.

use crate::error::RoomError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::RoomCode;

use super::{lobby, round, Session};

/// Turn a rejection into the requester-only notice
pub(super) fn reject(action: &str, e: RoomError) -> Option<ServerMessage> {
    match e {
        RoomError::RoomNotFound => {
            tracing::debug!("{} ignored: room not found", action);
            None
        }
        e => {
            tracing::debug!("{} rejected: {}", action, e);
            Some(ServerMessage::from(&e))
        }
    }
}

/// The player this connection acts as in `code`
pub(super) fn requester<'a>(session: &'a Session, code: &RoomCode) -> Result<&'a str, RoomError> {
    if !session.is_in(code) {
        return Err(RoomError::UnknownPlayer);
    }
    session.player_id.as_deref().ok_or(RoomError::UnknownPlayer)
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    state: &AppState,
) -> Option<ServerMessage> {
    match msg {
        // Lobby coordinator
        ClientMessage::JoinLobby { room_code, player } => {
            lobby::handle_join(state, session, room_code, player).await
        }

        ClientMessage::LeaveLobby {
            room_code,
            player_id,
        } => lobby::handle_leave(state, session, room_code, player_id).await,

        ClientMessage::PlayerReady {
            room_code,
            player_id,
            is_ready,
        } => lobby::handle_ready(state, session, room_code, player_id, is_ready).await,

        ClientMessage::ToggleBots { room_code } => {
            lobby::handle_toggle_bots(state, session, room_code).await
        }

        ClientMessage::StartGame { room_code } => {
            lobby::handle_start_game(state, session, room_code).await
        }

        ClientMessage::ChatMessage { room_code, message } => {
            lobby::handle_chat(state, session, room_code, message).await
        }

        ClientMessage::ResetGame { room_code } => {
            lobby::handle_reset_game(state, session, room_code).await
        }

        // Round coordinator
        ClientMessage::SubmitCard {
            room_code,
            player_id,
            card,
        } => round::handle_submit_card(state, session, room_code, player_id, card).await,

        ClientMessage::SelectWinner {
            room_code,
            player_id,
            card_id,
        } => round::handle_select_winner(state, session, room_code, player_id, card_id).await,

        ClientMessage::ForceJudging { room_code } => {
            round::handle_force_judging(state, session, room_code).await
        }

        ClientMessage::NextRound { room_code } => {
            round::handle_next_round(state, session, room_code).await
        }
    }
}
