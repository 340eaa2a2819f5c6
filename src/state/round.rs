//! Round coordinator entry points and the RoundEnd timer

use super::AppState;
use crate::error::RoomError;
use crate::room::{Room, WinnerPick};
use crate::types::*;

impl AppState {
    pub async fn submit_card(
        &self,
        code: &RoomCode,
        player_id: &str,
        card_id: &str,
    ) -> Result<(), RoomError> {
        self.mutate(code, |room, _| room.submit_card(player_id, card_id))
            .await
    }

    pub async fn select_winner(
        &self,
        code: &RoomCode,
        czar_id: &str,
        pick: WinnerPick,
    ) -> Result<(), RoomError> {
        self.mutate(code, |room, _| room.select_winner(czar_id, pick))
            .await
    }

    pub async fn force_judging(
        &self,
        code: &RoomCode,
        requester_id: &str,
    ) -> Result<(), RoomError> {
        self.mutate(code, |room, _| room.force_judging(requester_id))
            .await
    }

    /// Host skips the rest of the RoundEnd window
    pub async fn next_round(&self, code: &RoomCode, requester_id: &str) -> Result<u32, RoomError> {
        self.mutate(code, |room, catalog| {
            room.require_host(requester_id)?;
            room.advance_round(None, catalog, &mut rand::rng())
        })
        .await
    }

    /// Move from RoundEnd of `expected_round` to the next round
    pub async fn advance_round(
        &self,
        code: &RoomCode,
        expected_round: Option<u32>,
    ) -> Result<u32, RoomError> {
        self.mutate(code, |room, catalog| {
            room.advance_round(expected_round, catalog, &mut rand::rng())
        })
        .await
    }

    pub(crate) fn schedule_round_end(&self, room: &mut Room, number: u32) {
        let state = self.clone();
        let code = room.code.clone();
        let delay = self.config.round_end_delay;

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            match state.advance_round(&code, Some(number)).await {
                Ok(next) => tracing::debug!("Room {} auto-advanced to round {}", code, next),
                // Room gone or already advanced by the host
                Err(e) => tracing::debug!("Round-end timer for room {} skipped: {}", code, e),
            }
        });
        room.track_timer(task.abort_handle());
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use std::time::Duration;

    async fn czar_and_submit_all(state: &AppState, code: &RoomCode) -> String {
        let (czar, picks) = {
            let room = state.rooms.lock(code).await.unwrap();
            let round = room.round.as_ref().unwrap();
            let picks: Vec<(String, String)> = round
                .hands
                .iter()
                .map(|(id, hand)| (id.clone(), hand[0].id.clone()))
                .collect();
            (round.card_czar_id.clone(), picks)
        };
        for (player, card) in picks {
            state.submit_card(code, &player, &card).await.unwrap();
        }
        czar
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_end_auto_advances() {
        let state = fast_state();
        let code = RoomCode::new("abcd");
        lobby(&state, &code, &["h", "p1", "p2"]).await;
        state.start_game(&code, "h").await.unwrap();

        let czar = czar_and_submit_all(&state, &code).await;
        state
            .select_winner(&code, &czar, WinnerPick::Player("p1".to_string()))
            .await
            .unwrap();
        assert_eq!(state.room_phase(&code).await, Some(RoomPhase::RoundEnd));

        tokio::time::sleep(Duration::from_secs(6)).await;

        let room = state.rooms.lock(&code).await.unwrap();
        let round = room.round.as_ref().unwrap();
        assert_eq!(round.number, 2);
        assert_eq!(round.phase, RoundPhase::Selecting);
        assert_eq!(round.card_czar_id, "p1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_host_next_round_cancels_timer() {
        let state = fast_state();
        let code = RoomCode::new("abcd");
        lobby(&state, &code, &["h", "p1", "p2"]).await;
        state.start_game(&code, "h").await.unwrap();

        let czar = czar_and_submit_all(&state, &code).await;
        state
            .select_winner(&code, &czar, WinnerPick::Player("p2".to_string()))
            .await
            .unwrap();

        assert_eq!(
            state.next_round(&code, "p1").await,
            Err(RoomError::NotHost)
        );
        assert_eq!(state.next_round(&code, "h").await, Ok(2));

        // The stale timer must not skip round 2
        tokio::time::sleep(Duration::from_secs(10)).await;
        let room = state.rooms.lock(&code).await.unwrap();
        assert_eq!(room.round.as_ref().unwrap().number, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timer_noops_after_room_is_gone() {
        let state = fast_state();
        let code = RoomCode::new("abcd");
        lobby(&state, &code, &["h", "p1", "p2"]).await;
        state.start_game(&code, "h").await.unwrap();

        let czar = czar_and_submit_all(&state, &code).await;
        state
            .select_winner(&code, &czar, WinnerPick::Player("p1".to_string()))
            .await
            .unwrap();

        for id in ["h", "p1", "p2"] {
            state.leave(&code, id).await.unwrap();
        }
        assert!(state.rooms.is_empty().await);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(state.rooms.is_empty().await);
    }
}
