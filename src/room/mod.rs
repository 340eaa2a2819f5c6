//! The Room record and its rules
//!
//! Every method here is synchronous and validates fully before it writes, so a
//! rejected action leaves the room untouched and publishes nothing. Successful
//! mutations publish their broadcasts last, while the caller still holds the
//! room lock.

mod lobby;
mod round;

pub use round::WinnerPick;

use crate::broadcast::{Envelope, RoomChannel};
use crate::protocol::{RosterEntry, RoundView, ServerMessage, SubmissionView};
use crate::types::*;
use std::collections::{HashMap, VecDeque};
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

/// Identifies "where" a room is: no round, or a round number and phase.
/// Deferred tasks are tied to a stage and cancelled when it changes.
pub type Stage = Option<(u32, RoundPhase)>;

#[derive(Debug)]
pub struct Room {
    pub code: RoomCode,
    /// Roster in join order
    pub players: Vec<Player>,
    pub scores: Scores,
    pub round: Option<Round>,
    pub chat: VecDeque<ChatMessage>,
    /// Which connection currently plays each human seat
    connections: HashMap<PlayerId, ConnectionId>,
    channel: RoomChannel,
    timers: Vec<AbortHandle>,
    closed: bool,
    blind_judging: bool,
}

impl Room {
    pub fn new(code: RoomCode, blind_judging: bool) -> Self {
        Self {
            code,
            players: Vec::new(),
            scores: Scores::new(),
            round: None,
            chat: VecDeque::new(),
            connections: HashMap::new(),
            channel: RoomChannel::new(),
            timers: Vec::new(),
            closed: false,
            blind_judging,
        }
    }

    pub fn phase(&self) -> RoomPhase {
        self.round
            .as_ref()
            .map(|r| r.phase.into())
            .unwrap_or(RoomPhase::Lobby)
    }

    pub fn stage(&self) -> Stage {
        self.round.as_ref().map(|r| (r.number, r.phase))
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.iter().find(|p| p.id == player_id)
    }

    pub fn is_member(&self, player_id: &str) -> bool {
        self.player(player_id).is_some()
    }

    pub fn host(&self) -> Option<&Player> {
        self.players.iter().find(|p| p.is_host)
    }

    pub fn score_of(&self, player_id: &str) -> u32 {
        self.scores.get(player_id).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.channel.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Mark as discarded; pending tasks are cancelled and later lookups miss
    pub fn close(&mut self) {
        self.closed = true;
        self.cancel_timers();
    }

    pub fn track_timer(&mut self, handle: AbortHandle) {
        self.timers.retain(|h| !h.is_finished());
        self.timers.push(handle);
    }

    pub fn cancel_timers(&mut self) {
        for handle in self.timers.drain(..) {
            handle.abort();
        }
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.iter().filter(|h| !h.is_finished()).count()
    }

    pub fn roster(&self) -> Vec<RosterEntry> {
        self.players
            .iter()
            .map(|p| RosterEntry {
                player: p.clone(),
                score: self.score_of(&p.id),
            })
            .collect()
    }

    pub fn publish_roster(&self) {
        self.channel.publish(ServerMessage::LobbyPlayers {
            players: self.roster(),
        });
    }

    /// Submissions as the room may see them right now
    pub fn submission_views(&self) -> Vec<SubmissionView> {
        let Some(round) = &self.round else {
            return Vec::new();
        };

        let hide_authors = self.blind_judging && round.phase != RoundPhase::RoundEnd;
        let mut views: Vec<SubmissionView> = round
            .submissions
            .iter()
            .map(|s| SubmissionView {
                player_id: (!hide_authors).then(|| s.player_id.clone()),
                card: s.card.clone(),
            })
            .collect();

        // Submission order would give authors away
        if hide_authors {
            views.sort_by(|a, b| a.card.id.cmp(&b.card.id));
        }
        views
    }

    /// Round state for one player, optionally carrying their own hand
    pub fn round_view(&self, player_id: Option<&str>, with_hand: bool) -> Option<RoundView> {
        let round = self.round.as_ref()?;
        let hand = with_hand.then(|| {
            player_id
                .and_then(|id| round.hands.get(id))
                .cloned()
                .unwrap_or_default()
        });

        Some(RoundView {
            number: round.number,
            phase: round.phase,
            card_czar_id: round.card_czar_id.clone(),
            prompt: round.prompt.clone(),
            hand,
            submissions: self.submission_views(),
            winner: round.winner.clone(),
        })
    }

    /// Everything a (re)connecting member needs to converge on the current state
    pub fn snapshot_for(&self, player_id: Option<&str>) -> Vec<ServerMessage> {
        let mut messages = vec![ServerMessage::LobbyPlayers {
            players: self.roster(),
        }];
        if let Some(round) = self.round_view(player_id, true) {
            messages.push(ServerMessage::RoundUpdate { round });
        }
        messages
    }

    pub fn publish_snapshot_to(&self, player_id: &str) {
        for message in self.snapshot_for(Some(player_id)) {
            self.channel.publish_to(player_id, message);
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;

    #[test]
    fn test_new_room_is_in_lobby() {
        let room = Room::new(RoomCode::new("ABCD"), false);
        assert_eq!(room.code.as_str(), "abcd");
        assert_eq!(room.phase(), RoomPhase::Lobby);
        assert!(room.stage().is_none());
        assert!(room.is_empty());
    }

    #[test]
    fn test_snapshot_includes_own_hand_only() {
        let room = started_room(&["h", "p1", "p2"]);
        let snapshot = room.snapshot_for(Some("p1"));

        assert_eq!(snapshot.len(), 2);
        match &snapshot[1] {
            ServerMessage::RoundUpdate { round } => {
                let hand = round.hand.as_ref().unwrap();
                assert_eq!(hand, &room.round.as_ref().unwrap().hands["p1"]);
            }
            other => panic!("Expected RoundUpdate, got {:?}", other),
        }

        // The Czar has no hand
        match &room.snapshot_for(Some("h"))[1] {
            ServerMessage::RoundUpdate { round } => {
                assert_eq!(round.hand.as_deref(), Some(&[][..]));
            }
            other => panic!("Expected RoundUpdate, got {:?}", other),
        }
    }

    #[test]
    fn test_blind_judging_hides_authors_until_round_end() {
        let catalog = crate::catalog::CardCatalog::builtin();
        let mut room = Room::new(RoomCode::new("abcd"), true);
        for id in ["h", "p1", "p2"] {
            room.join(join_player(id), &catalog, &mut rng()).unwrap();
        }
        room.set_ready("p1", true).unwrap();
        room.set_ready("p2", true).unwrap();
        room.start_game("h", &catalog, &mut rng()).unwrap();

        let card = first_card(&room, "p1");
        room.submit_card("p1", &card.id).unwrap();
        let views = room.submission_views();
        assert_eq!(views.len(), 1);
        assert!(views[0].player_id.is_none());

        let card = first_card(&room, "p2");
        room.submit_card("p2", &card.id).unwrap();
        room.select_winner("h", WinnerPick::Card(card.id.clone()))
            .unwrap();

        let views = room.submission_views();
        assert!(views.iter().all(|v| v.player_id.is_some()));
    }
}
