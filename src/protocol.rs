use crate::types::*;
use serde::{Deserialize, Serialize};

pub const PROTOCOL_VERSION: &str = "1.0";

/// Player fields a client sends when joining. Host/ready/bot flags are server-owned.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinPlayer {
    pub id: PlayerId,
    pub name: String,
    #[serde(default)]
    pub avatar: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    JoinLobby {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
        player: JoinPlayer,
    },
    LeaveLobby {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
        player_id: PlayerId,
    },
    PlayerReady {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
        player_id: PlayerId,
        is_ready: bool,
    },
    ToggleBots {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
    },
    StartGame {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
    },
    SubmitCard {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
        player_id: PlayerId,
        card: Card,
    },
    /// Pick by author, or by card id when judging blind
    SelectWinner {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
        #[serde(default)]
        player_id: Option<PlayerId>,
        #[serde(default)]
        card_id: Option<CardId>,
    },
    ChatMessage {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
        message: ChatMessage,
    },
    /// Host: judge with whatever submissions exist
    ForceJudging {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
    },
    /// Host: skip the rest of the RoundEnd window
    NextRound {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
    },
    /// Host: back to the lobby with zeroed scores
    ResetGame {
        #[serde(alias = "gameCode")]
        room_code: RoomCode,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        server_now: String,
    },
    /// Full roster snapshot in join order
    LobbyPlayers {
        players: Vec<RosterEntry>,
    },
    GameStarted {
        room_code: RoomCode,
    },
    /// A freshly dealt round, carrying only the recipient's own hand
    StartRound {
        round: RoundView,
    },
    /// Phase change or snapshot; `hand` is present only when re-sent for recovery
    RoundUpdate {
        round: RoundView,
    },
    UpdateSubmissions {
        submissions: Vec<SubmissionView>,
    },
    UpdateWinner {
        player_id: PlayerId,
        player_name: String,
        card: Card,
        scores: Scores,
    },
    ChatMessage {
        message: ChatMessage,
    },
    GameReset {
        room_code: RoomCode,
    },
    /// Rejection notice, sent to the requester only
    LobbyError {
        code: String,
        message: String,
    },
}

impl From<&crate::error::RoomError> for ServerMessage {
    fn from(e: &crate::error::RoomError) -> Self {
        ServerMessage::LobbyError {
            code: e.code().to_string(),
            message: e.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    #[serde(flatten)]
    pub player: Player,
    pub score: u32,
}

/// Submission as shown to the room (author hidden when judging blind)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionView {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub player_id: Option<PlayerId>,
    pub card: Card,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundView {
    pub number: u32,
    pub phase: RoundPhase,
    pub card_czar_id: PlayerId,
    pub prompt: Card,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hand: Option<Vec<Card>>,
    pub submissions: Vec<SubmissionView>,
    pub winner: Option<Winner>,
}
