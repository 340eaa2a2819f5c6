mod lobby;
mod round;
pub mod store;

pub use store::RoomStore;

use crate::bots;
use crate::catalog::CardCatalog;
use crate::config::GameConfig;
use crate::error::RoomError;
use crate::room::{Room, Stage};
use crate::types::*;
use std::sync::Arc;

/// Shared application state: the room table plus read-only inputs
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomStore,
    pub catalog: Arc<CardCatalog>,
    pub config: Arc<GameConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(CardCatalog::builtin(), GameConfig::default())
    }

    pub fn with_config(catalog: CardCatalog, config: GameConfig) -> Self {
        Self {
            rooms: RoomStore::new(config.blind_judging),
            catalog: Arc::new(catalog),
            config: Arc::new(config),
        }
    }

    /// Run one read-modify-write on a room under its lock.
    ///
    /// `op` is synchronous, so nothing else can touch the room between its
    /// validation and its writes. Broadcasts published inside `op` are ordered
    /// by the same lock.
    pub(crate) async fn mutate<T>(
        &self,
        code: &RoomCode,
        op: impl FnOnce(&mut Room, &CardCatalog) -> Result<T, RoomError>,
    ) -> Result<T, RoomError> {
        let mut room = self
            .rooms
            .lock(code)
            .await
            .ok_or(RoomError::RoomNotFound)?;

        let before = room.stage();
        let result = op(&mut room, &self.catalog);
        if result.is_ok() {
            self.on_stage_change(&mut room, before);
        }
        result
    }

    /// Deferred work belongs to a stage: when the stage moves on, the old
    /// tasks are cancelled and the new stage's tasks are scheduled.
    pub(crate) fn on_stage_change(&self, room: &mut Room, before: Stage) {
        let after = room.stage();
        if after == before {
            return;
        }

        room.cancel_timers();
        match after {
            Some((number, RoundPhase::Selecting)) => {
                bots::schedule_submissions(self, room, number)
            }
            Some((number, RoundPhase::Judging)) => bots::schedule_judging(self, room, number),
            Some((number, RoundPhase::RoundEnd)) => self.schedule_round_end(room, number),
            None => {}
        }
    }

    pub async fn room_phase(&self, code: &RoomCode) -> Option<RoomPhase> {
        Some(self.rooms.lock(code).await?.phase())
    }

    /// Roster and round state for one member, used to resync lagging connections
    pub async fn snapshot(
        &self,
        code: &RoomCode,
        player_id: Option<&str>,
    ) -> Option<Vec<crate::protocol::ServerMessage>> {
        Some(self.rooms.lock(code).await?.snapshot_for(player_id))
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
