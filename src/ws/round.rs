//! Round message handlers
//!
//! Submissions, judging and the host's round triggers.

use super::handlers::{reject, requester};
use super::Session;
use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::room::WinnerPick;
use crate::state::AppState;
use crate::types::{Card, CardId, PlayerId, RoomCode};

pub async fn handle_submit_card(
    state: &AppState,
    session: &Session,
    room_code: RoomCode,
    player_id: PlayerId,
    card: Card,
) -> Option<ServerMessage> {
    let result = match requester(session, &room_code) {
        Ok(me) if me == player_id => {
            tracing::debug!("Player {} submits card {} in room {}", me, card.id, room_code);
            state.submit_card(&room_code, me, &card.id).await
        }
        Ok(_) => Err(RoomError::UnknownPlayer),
        Err(e) => Err(e),
    };
    result.err().and_then(|e| reject("submit-card", e))
}

pub async fn handle_select_winner(
    state: &AppState,
    session: &Session,
    room_code: RoomCode,
    player_id: Option<PlayerId>,
    card_id: Option<CardId>,
) -> Option<ServerMessage> {
    let pick = match (player_id, card_id) {
        (Some(player_id), _) => WinnerPick::Player(player_id),
        (None, Some(card_id)) => WinnerPick::Card(card_id),
        (None, None) => return reject("select-winner", RoomError::NoSubmission),
    };

    let result = match requester(session, &room_code) {
        Ok(me) => {
            tracing::info!("Czar {} picks {:?} in room {}", me, pick, room_code);
            state.select_winner(&room_code, me, pick).await
        }
        Err(e) => Err(e),
    };
    result.err().and_then(|e| reject("select-winner", e))
}

pub async fn handle_force_judging(
    state: &AppState,
    session: &Session,
    room_code: RoomCode,
) -> Option<ServerMessage> {
    let result = match requester(session, &room_code) {
        Ok(me) => state.force_judging(&room_code, me).await,
        Err(e) => Err(e),
    };
    result.err().and_then(|e| reject("force-judging", e))
}

pub async fn handle_next_round(
    state: &AppState,
    session: &Session,
    room_code: RoomCode,
) -> Option<ServerMessage> {
    let result = match requester(session, &room_code) {
        Ok(me) => state.next_round(&room_code, me).await.map(|_| ()),
        Err(e) => Err(e),
    };
    result.err().and_then(|e| reject("next-round", e))
}
