//! Lobby coordinator entry points

use super::AppState;
use crate::broadcast::Envelope;
use crate::error::RoomError;
use crate::protocol::JoinPlayer;
use crate::types::*;
use tokio::sync::broadcast;

impl AppState {
    /// Join (or re-join) a room, creating it on first use.
    ///
    /// Returns a receiver for the room's broadcasts, subscribed before the
    /// roster update so the joiner sees it too.
    pub async fn join(
        &self,
        code: &RoomCode,
        player: JoinPlayer,
    ) -> Result<broadcast::Receiver<Envelope>, RoomError> {
        self.join_as(code, player, ConnectionId::new()).await
    }

    /// Join on behalf of `connection`, which then holds the seat until
    /// another connection re-joins with the same player id
    pub async fn join_as(
        &self,
        code: &RoomCode,
        player: JoinPlayer,
        connection: ConnectionId,
    ) -> Result<broadcast::Receiver<Envelope>, RoomError> {
        if code.is_empty() {
            return Err(RoomError::RoomNotFound);
        }

        let player_id = player.id.trim().to_string();
        let mut room = self.rooms.lock_or_create(code).await;
        let rx = room.subscribe();
        let before = room.stage();

        let joined = room.join(player, &self.catalog, &mut rand::rng());
        match joined {
            Ok(()) => {
                room.bind_connection(&player_id, connection);
                self.on_stage_change(&mut room, before);
                Ok(rx)
            }
            Err(e) => {
                let empty = room.is_empty();
                drop(room);
                if empty {
                    self.rooms.remove_if_empty(code).await;
                }
                Err(e)
            }
        }
    }

    /// Same path for explicit leave and connection loss
    pub async fn leave(&self, code: &RoomCode, player_id: &str) -> Result<(), RoomError> {
        let emptied = self
            .mutate(code, |room, catalog| {
                room.leave(player_id, catalog, &mut rand::rng())?;
                Ok(room.is_empty())
            })
            .await?;

        if emptied {
            self.rooms.remove_if_empty(code).await;
        }
        Ok(())
    }

    /// Leave only if `connection` still holds the seat. Returns false when a
    /// newer connection has taken the seat over, in which case nothing changes.
    pub async fn leave_as(
        &self,
        code: &RoomCode,
        player_id: &str,
        connection: ConnectionId,
    ) -> Result<bool, RoomError> {
        let released = self
            .mutate(code, |room, catalog| {
                if !room.holds_connection(player_id, connection) {
                    return Ok(None);
                }
                room.leave(player_id, catalog, &mut rand::rng())?;
                Ok(Some(room.is_empty()))
            })
            .await?;

        match released {
            Some(emptied) => {
                if emptied {
                    self.rooms.remove_if_empty(code).await;
                }
                Ok(true)
            }
            None => {
                tracing::debug!(
                    "Player {} in room {} is held by a newer connection, not leaving",
                    player_id,
                    code
                );
                Ok(false)
            }
        }
    }

    pub async fn set_ready(
        &self,
        code: &RoomCode,
        player_id: &str,
        is_ready: bool,
    ) -> Result<(), RoomError> {
        self.mutate(code, |room, _| room.set_ready(player_id, is_ready))
            .await
    }

    pub async fn toggle_bots(&self, code: &RoomCode, requester_id: &str) -> Result<(), RoomError> {
        self.mutate(code, |room, _| room.toggle_bots(requester_id))
            .await
    }

    /// Host-gated start; deals round 1 on success
    pub async fn start_game(&self, code: &RoomCode, requester_id: &str) -> Result<(), RoomError> {
        self.mutate(code, |room, catalog| {
            room.start_game(requester_id, catalog, &mut rand::rng())
        })
        .await
    }

    pub async fn reset_game(&self, code: &RoomCode, requester_id: &str) -> Result<(), RoomError> {
        self.mutate(code, |room, _| room.reset_game(requester_id))
            .await
    }

    pub async fn chat(
        &self,
        code: &RoomCode,
        sender_id: &str,
        message: ChatMessage,
    ) -> Result<(), RoomError> {
        self.mutate(code, |room, _| room.chat(sender_id, message))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::protocol::ServerMessage;

    #[tokio::test]
    async fn test_join_creates_room_and_broadcasts_roster() {
        let state = AppState::new();
        let code = RoomCode::new("ABCD");

        let mut rx = state.join(&code, join_player("h")).await.unwrap();
        let envelope = rx.recv().await.unwrap();
        match envelope.message {
            ServerMessage::LobbyPlayers { players } => {
                assert_eq!(players.len(), 1);
                assert!(players[0].player.is_host);
            }
            other => panic!("Expected LobbyPlayers, got {:?}", other),
        }

        assert!(state.rooms.get(&RoomCode::new("abcd")).await.is_some());
    }

    #[tokio::test]
    async fn test_failed_join_does_not_leave_empty_room() {
        let state = AppState::new();
        let code = RoomCode::new("abcd");
        let mut bad = join_player("p1");
        bad.id = String::new();

        assert_eq!(
            state.join(&code, bad).await.err(),
            Some(RoomError::UnknownPlayer)
        );
        assert!(state.rooms.is_empty().await);
    }

    #[tokio::test]
    async fn test_last_leave_discards_room() {
        let state = AppState::new();
        let code = RoomCode::new("abcd");
        state.join(&code, join_player("h")).await.unwrap();
        state.join(&code, join_player("p1")).await.unwrap();

        state.leave(&code, "h").await.unwrap();
        assert_eq!(state.rooms.len().await, 1);

        state.leave(&code, "p1").await.unwrap();
        assert!(state.rooms.is_empty().await);
        assert_eq!(state.leave(&code, "p1").await, Err(RoomError::RoomNotFound));
    }

    #[tokio::test]
    async fn test_stale_connection_cannot_evict_rejoined_player() {
        let state = AppState::new();
        let code = RoomCode::new("abcd");
        let old_socket = ConnectionId::new();
        let new_socket = ConnectionId::new();
        state.join_as(&code, join_player("h"), old_socket).await.unwrap();
        state.join(&code, join_player("p1")).await.unwrap();

        // h reconnects before the old socket's close is processed
        state.join_as(&code, join_player("h"), new_socket).await.unwrap();
        assert_eq!(state.leave_as(&code, "h", old_socket).await, Ok(false));

        {
            let room = state.rooms.lock(&code).await.unwrap();
            assert!(room.is_member("h"));
            assert!(room.player("h").unwrap().is_host);
            assert!(!room.player("p1").unwrap().is_host);
        }

        assert_eq!(state.leave_as(&code, "h", new_socket).await, Ok(true));
        let room = state.rooms.lock(&code).await.unwrap();
        assert!(!room.is_member("h"));
    }

    #[tokio::test]
    async fn test_rejected_start_publishes_nothing() {
        let state = AppState::new();
        let code = RoomCode::new("abcd");
        lobby(&state, &code, &["h", "p1", "p2"]).await;

        let mut rx = state.rooms.lock(&code).await.unwrap().subscribe();
        assert_eq!(
            state.start_game(&code, "p1").await,
            Err(RoomError::NotHost)
        );
        assert!(rx.try_recv().is_err());
        assert_eq!(state.room_phase(&code).await, Some(RoomPhase::Lobby));
    }
}
