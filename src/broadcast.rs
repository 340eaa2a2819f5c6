//! Per-room broadcast channel
//!
//! Every room owns one `tokio::sync::broadcast` sender. All messages for a room,
//! including ones meant for a single member, travel through it in publish order,
//! so a receiver never sees "winner selected" before the submissions that led to it.

use crate::protocol::ServerMessage;
use crate::types::PlayerId;
use tokio::sync::broadcast;

/// Buffered messages per room before slow receivers start lagging
const ROOM_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq)]
pub enum Audience {
    Room,
    Player(PlayerId),
}

#[derive(Debug, Clone)]
pub struct Envelope {
    pub audience: Audience,
    pub message: ServerMessage,
}

impl Envelope {
    /// Whether the connection bound to `player_id` should forward this
    pub fn is_for(&self, player_id: Option<&str>) -> bool {
        match &self.audience {
            Audience::Room => true,
            Audience::Player(target) => player_id == Some(target.as_str()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoomChannel {
    tx: broadcast::Sender<Envelope>,
}

impl RoomChannel {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(ROOM_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    /// Deliver to every member
    pub fn publish(&self, message: ServerMessage) {
        self.send(Envelope {
            audience: Audience::Room,
            message,
        });
    }

    /// Deliver to one member, in order with the room's other traffic
    pub fn publish_to(&self, player_id: &str, message: ServerMessage) {
        self.send(Envelope {
            audience: Audience::Player(player_id.to_string()),
            message,
        });
    }

    fn send(&self, envelope: Envelope) {
        // No receivers (e.g. a bot-only moment or tests) is fine
        let _ = self.tx.send(envelope);
    }

    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for RoomChannel {
    fn default() -> Self {
        Self::new()
    }
}
