//! Process-wide table of rooms
//!
//! The map lock only guards membership of the table. Each room has its own
//! mutex, so rooms never contend with each other while mutating.

use crate::room::Room;
use crate::types::RoomCode;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

pub type SharedRoom = Arc<Mutex<Room>>;

#[derive(Clone, Default)]
pub struct RoomStore {
    rooms: Arc<RwLock<HashMap<RoomCode, SharedRoom>>>,
    blind_judging: bool,
}

impl RoomStore {
    pub fn new(blind_judging: bool) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            blind_judging,
        }
    }

    /// Idempotent; creates an empty room on first use
    pub async fn get_or_create(&self, code: &RoomCode) -> SharedRoom {
        if let Some(room) = self.get(code).await {
            return room;
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(code.clone())
            .or_insert_with(|| {
                tracing::info!("Creating room {}", code);
                Arc::new(Mutex::new(Room::new(code.clone(), self.blind_judging)))
            })
            .clone()
    }

    pub async fn get(&self, code: &RoomCode) -> Option<SharedRoom> {
        self.rooms.read().await.get(code).cloned()
    }

    /// Lock a live room, creating it if needed. Retries if the room it found
    /// was discarded between lookup and lock.
    pub async fn lock_or_create(&self, code: &RoomCode) -> OwnedMutexGuard<Room> {
        loop {
            let room = self.get_or_create(code).await.lock_owned().await;
            if !room.is_closed() {
                return room;
            }
        }
    }

    /// Lock an existing live room
    pub async fn lock(&self, code: &RoomCode) -> Option<OwnedMutexGuard<Room>> {
        let room = self.get(code).await?.lock_owned().await;
        (!room.is_closed()).then_some(room)
    }

    /// Discard the room if its roster is empty. Pending tasks are cancelled.
    pub async fn remove_if_empty(&self, code: &RoomCode) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(shared) = rooms.get(code).cloned() else {
            return false;
        };

        let mut room = shared.lock().await;
        if !room.is_empty() {
            return false;
        }
        room.close();
        rooms.remove(code);
        tracing::info!("Removed empty room {}", code);
        true
    }

    pub async fn len(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_or_create_is_idempotent() {
        let store = RoomStore::default();
        let a = store.get_or_create(&RoomCode::new("ABCD")).await;
        let b = store.get_or_create(&RoomCode::new("abcd")).await;

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_get_missing_room() {
        let store = RoomStore::default();
        assert!(store.get(&RoomCode::new("nope")).await.is_none());
        assert!(store.lock(&RoomCode::new("nope")).await.is_none());
    }

    #[tokio::test]
    async fn test_remove_if_empty_closes_room() {
        let store = RoomStore::default();
        let code = RoomCode::new("abcd");
        let shared = store.get_or_create(&code).await;

        assert!(store.remove_if_empty(&code).await);
        assert!(store.is_empty().await);
        assert!(shared.lock().await.is_closed());

        // A fresh room replaces the discarded one
        let room = store.lock_or_create(&code).await;
        assert!(!room.is_closed());
    }
}
