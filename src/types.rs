use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Opaque ID types for type safety
pub type PlayerId = String;
pub type CardId = String;

/// Maximum number of players in one room
pub const MAX_PLAYERS: usize = 16;
/// Minimum roster size for the host to start a game
pub const MIN_PLAYERS_TO_START: usize = 3;
/// Minimum roster size for a running game to keep dealing rounds
pub const MIN_PLAYERS_IN_GAME: usize = 2;
/// Response cards dealt to each non-Czar player per round
pub const HAND_SIZE: usize = 7;
/// Chat log entries kept per room
pub const CHAT_HISTORY_LIMIT: usize = 200;

/// Case-insensitive room code. Always stored lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct RoomCode(String);

impl RoomCode {
    pub fn new(code: &str) -> Self {
        Self(code.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for RoomCode {
    fn from(code: String) -> Self {
        Self::new(&code)
    }
}

impl From<&str> for RoomCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A prompt ("black") or response ("white") card from the catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerKind {
    Human,
    Bot,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub is_host: bool,
    pub is_ready: bool,
    pub kind: PlayerKind,
}

impl Player {
    pub fn human(id: impl Into<String>, name: impl Into<String>, avatar: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar: avatar.into(),
            is_host: false,
            is_ready: false,
            kind: PlayerKind::Human,
        }
    }

    pub fn bot(id: &str, name: &str, avatar: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            avatar: avatar.to_string(),
            is_host: false,
            is_ready: true,
            kind: PlayerKind::Bot,
        }
    }

    pub fn is_bot(&self) -> bool {
        matches!(self.kind, PlayerKind::Bot)
    }

    /// Bots never hold up a start
    pub fn counts_as_ready(&self) -> bool {
        match self.kind {
            PlayerKind::Human => self.is_ready,
            PlayerKind::Bot => true,
        }
    }
}

/// The fixed bot roster added by `toggle-bots`: (id, name, avatar)
pub const BOT_ROSTER: &[(&str, &str, &str)] = &[
    ("sean", "Sean Jerubin", "2"),
    ("rengo", "Rengo Yang", "4"),
    ("yeng", "Yeng Chang", "3"),
    ("tdawg", "Tdawg Thao", "3"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoundPhase {
    Selecting,
    Judging,
    RoundEnd,
}

/// Phase of the whole room; `Lobby` means no round has been dealt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomPhase {
    Lobby,
    Selecting,
    Judging,
    RoundEnd,
}

impl From<RoundPhase> for RoomPhase {
    fn from(phase: RoundPhase) -> Self {
        match phase {
            RoundPhase::Selecting => RoomPhase::Selecting,
            RoundPhase::Judging => RoomPhase::Judging,
            RoundPhase::RoundEnd => RoomPhase::RoundEnd,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub player_id: PlayerId,
    pub card: Card,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Winner {
    pub player_id: PlayerId,
    pub player_name: String,
    pub card: Card,
}

#[derive(Debug, Clone)]
pub struct Round {
    pub number: u32,
    pub phase: RoundPhase,
    pub card_czar_id: PlayerId,
    /// Roster position of the Czar when the round was dealt
    pub czar_seat: usize,
    pub prompt: Card,
    pub hands: HashMap<PlayerId, Vec<Card>>,
    /// Kept in first-submission order; a resubmission replaces in place
    pub submissions: Vec<Submission>,
    pub winner: Option<Winner>,
}

impl Round {
    pub fn submission_of(&self, player_id: &str) -> Option<&Submission> {
        self.submissions.iter().find(|s| s.player_id == player_id)
    }
}

/// Chat line, relayed verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    #[serde(default)]
    pub id: String,
    pub player_id: PlayerId,
    #[serde(default)]
    pub player_name: String,
    pub text: String,
    #[serde(default)]
    pub timestamp: i64,
}

pub type Scores = HashMap<PlayerId, u32>;

/// Issued per WebSocket connection; ties a seat to the socket that last joined it
pub type ConnectionId = ulid::Ulid;
