//! Bot policy
//!
//! Bots are driven by deferred tasks that call the same `submit_card` and
//! `select_winner` entry points a human connection uses. Each task re-checks
//! the room when it wakes: the room may be gone or the round may have moved on.

use crate::config::GameConfig;
use crate::room::{Room, WinnerPick};
use crate::state::AppState;
use crate::types::*;
use rand::seq::IndexedRandom;
use rand::Rng;
use std::time::Duration;

/// Random think time within the configured range
pub fn think_time(config: &GameConfig) -> Duration {
    let min = config.bot_delay_min.as_millis() as u64;
    let max = config.bot_delay_max.as_millis() as u64;
    if max <= min {
        return Duration::from_millis(min);
    }
    Duration::from_millis(rand::rng().random_range(min..=max))
}

/// Every bot holding a hand in round `number` submits after a delay
pub fn schedule_submissions(state: &AppState, room: &mut Room, number: u32) {
    let Some(round) = &room.round else {
        return;
    };

    let bots: Vec<PlayerId> = room
        .players
        .iter()
        .filter(|p| p.is_bot() && round.hands.contains_key(&p.id))
        .map(|p| p.id.clone())
        .collect();

    for bot_id in bots {
        let state = state.clone();
        let code = room.code.clone();
        let delay = think_time(&state.config);

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            submit_for_bot(&state, &code, number, &bot_id).await;
        });
        room.track_timer(task.abort_handle());
    }
}

/// A bot Czar picks a random submission after a delay
pub fn schedule_judging(state: &AppState, room: &mut Room, number: u32) {
    let Some(round) = &room.round else {
        return;
    };
    let czar_is_bot = room
        .player(&round.card_czar_id)
        .is_some_and(|p| p.is_bot());
    if !czar_is_bot {
        return;
    }

    let state = state.clone();
    let code = room.code.clone();
    let czar_id = round.card_czar_id.clone();
    let delay = think_time(&state.config);

    let task = tokio::spawn(async move {
        tokio::time::sleep(delay).await;
        judge_for_bot(&state, &code, number, &czar_id).await;
    });
    room.track_timer(task.abort_handle());
}

async fn submit_for_bot(state: &AppState, code: &RoomCode, number: u32, bot_id: &str) {
    let card_id = match state.rooms.lock(code).await {
        Some(room) => pick_card(&room, number, bot_id),
        None => return,
    };
    let Some(card_id) = card_id else {
        return;
    };

    match state.submit_card(code, bot_id, &card_id).await {
        Ok(()) => tracing::debug!("Bot {} submitted in room {}", bot_id, code),
        Err(e) => tracing::debug!("Bot {} could not submit in room {}: {}", bot_id, code, e),
    }
}

async fn judge_for_bot(state: &AppState, code: &RoomCode, number: u32, czar_id: &str) {
    let winner_id = match state.rooms.lock(code).await {
        Some(room) => pick_winner(&room, number),
        None => return,
    };
    let Some(winner_id) = winner_id else {
        return;
    };

    let pick = WinnerPick::Player(winner_id);
    match state.select_winner(code, czar_id, pick).await {
        Ok(()) => tracing::debug!("Bot Czar {} judged room {}", czar_id, code),
        Err(e) => tracing::debug!("Bot Czar {} could not judge room {}: {}", czar_id, code, e),
    }
}

/// A random card from the bot's hand, if it still has to submit in round `number`
fn pick_card(room: &Room, number: u32, bot_id: &str) -> Option<CardId> {
    let round = room.round.as_ref()?;
    if round.number != number
        || round.phase != RoundPhase::Selecting
        || round.submission_of(bot_id).is_some()
    {
        return None;
    }
    let hand = round.hands.get(bot_id)?;
    hand.choose(&mut rand::rng()).map(|card| card.id.clone())
}

/// A random submitter, if round `number` is still being judged
fn pick_winner(room: &Room, number: u32) -> Option<PlayerId> {
    let round = room.round.as_ref()?;
    if round.number != number || round.phase != RoundPhase::Judging {
        return None;
    }
    round
        .submissions
        .choose(&mut rand::rng())
        .map(|s| s.player_id.clone())
}
