//! Rejection reasons for room actions
//!
//! None of these are fatal. The dispatch layer turns them into a `lobby-error`
//! sent to the requester only.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Only the host can do that")]
    NotHost,
    #[error("Only the Card Czar can pick a winner")]
    NotCardCzar,
    #[error("That action is not allowed right now")]
    InvalidPhase,
    #[error("Unknown player")]
    UnknownPlayer,
    #[error("At least {0} players are needed to start")]
    NotEnoughPlayers(usize),
    #[error("Not every player is ready")]
    PlayersNotReady,
    #[error("That card is not in your hand")]
    CardNotInHand,
    #[error("That player has no submission this round")]
    NoSubmission,
}

impl RoomError {
    /// Stable machine-readable code for clients
    pub fn code(&self) -> &'static str {
        match self {
            RoomError::RoomNotFound => "ROOM_NOT_FOUND",
            RoomError::RoomFull => "ROOM_FULL",
            RoomError::NotHost => "NOT_HOST",
            RoomError::NotCardCzar => "NOT_CARD_CZAR",
            RoomError::InvalidPhase => "INVALID_PHASE",
            RoomError::UnknownPlayer => "UNKNOWN_PLAYER",
            RoomError::NotEnoughPlayers(_) => "NOT_ENOUGH_PLAYERS",
            RoomError::PlayersNotReady => "PLAYERS_NOT_READY",
            RoomError::CardNotInHand => "CARD_NOT_IN_HAND",
            RoomError::NoSubmission => "NO_SUBMISSION",
        }
    }
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read card deck: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse card deck: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("card deck has no prompt cards")]
    NoPrompts,
    #[error("card deck needs at least {needed} response cards, found {found}")]
    TooFewResponses { needed: usize, found: usize },
}
