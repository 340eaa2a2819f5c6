//! Round state machine: Selecting -> Judging -> RoundEnd -> Selecting ...

use super::Room;
use crate::catalog::CardCatalog;
use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::types::*;
use rand::Rng;
use std::collections::HashMap;

/// How the Czar identifies the winning submission
#[derive(Debug, Clone, PartialEq)]
pub enum WinnerPick {
    Player(PlayerId),
    /// Used when judging blind; the first submission of that card wins
    Card(CardId),
}

impl Room {
    /// Deal round `number` with the Czar at roster position `seat` (wrapping)
    pub fn begin_round<R: Rng + ?Sized>(
        &mut self,
        number: u32,
        seat: usize,
        catalog: &CardCatalog,
        rng: &mut R,
    ) {
        if self.players.is_empty() {
            self.round = None;
            return;
        }

        let seat = seat % self.players.len();
        let card_czar_id = self.players[seat].id.clone();
        let hands: HashMap<PlayerId, Vec<Card>> = self
            .players
            .iter()
            .filter(|p| p.id != card_czar_id)
            .map(|p| (p.id.clone(), catalog.deal_hand(rng, HAND_SIZE)))
            .collect();

        self.round = Some(Round {
            number,
            phase: RoundPhase::Selecting,
            card_czar_id: card_czar_id.clone(),
            czar_seat: seat,
            prompt: catalog.draw_prompt(rng),
            hands,
            submissions: Vec::new(),
            winner: None,
        });

        tracing::info!(
            "Room {} round {} dealt, Card Czar: {}",
            self.code,
            number,
            card_czar_id
        );

        for player in &self.players {
            if let Some(round) = self.round_view(Some(&player.id), true) {
                self.channel
                    .publish_to(&player.id, ServerMessage::StartRound { round });
            }
        }
    }

    /// Seat of the player after the current Czar, in join order.
    /// If the Czar left, whoever now occupies their seat is next.
    pub fn next_czar_seat(&self) -> usize {
        let Some(round) = &self.round else {
            return 0;
        };
        if self.players.is_empty() {
            return 0;
        }
        match self
            .players
            .iter()
            .position(|p| p.id == round.card_czar_id)
        {
            Some(index) => (index + 1) % self.players.len(),
            None => round.czar_seat % self.players.len(),
        }
    }

    /// Submit (or replace) the player's card for this round
    pub fn submit_card(&mut self, player_id: &str, card_id: &str) -> Result<(), RoomError> {
        if !self.is_member(player_id) {
            return Err(RoomError::UnknownPlayer);
        }
        let required = self.players.len().saturating_sub(1);
        let round = self.round.as_mut().ok_or(RoomError::InvalidPhase)?;
        if round.phase != RoundPhase::Selecting || round.card_czar_id == player_id {
            return Err(RoomError::InvalidPhase);
        }
        let card = round
            .hands
            .get(player_id)
            .and_then(|hand| hand.iter().find(|c| c.id == card_id))
            .cloned()
            .ok_or(RoomError::CardNotInHand)?;

        match round
            .submissions
            .iter_mut()
            .find(|s| s.player_id == player_id)
        {
            Some(existing) => existing.card = card,
            None => round.submissions.push(Submission {
                player_id: player_id.to_string(),
                card,
            }),
        }

        let count = round.submissions.len();
        tracing::info!(
            "Room {} round {}: {} submitted ({}/{})",
            self.code,
            round.number,
            player_id,
            count,
            required
        );
        if count >= required {
            round.phase = RoundPhase::Judging;
        }

        self.publish_submissions();
        if self.phase() == RoomPhase::Judging {
            self.publish_round_update();
        }
        Ok(())
    }

    /// Host escape hatch for a stalled round: judge what has been submitted
    pub fn force_judging(&mut self, requester_id: &str) -> Result<(), RoomError> {
        self.require_host(requester_id)?;
        let round = self.round.as_mut().ok_or(RoomError::InvalidPhase)?;
        if round.phase != RoundPhase::Selecting {
            return Err(RoomError::InvalidPhase);
        }
        if round.submissions.is_empty() {
            return Err(RoomError::NoSubmission);
        }

        round.phase = RoundPhase::Judging;
        tracing::info!(
            "Room {} round {} forced into judging with {} submissions",
            self.code,
            round.number,
            round.submissions.len()
        );
        self.publish_round_update();
        Ok(())
    }

    pub fn select_winner(&mut self, czar_id: &str, pick: WinnerPick) -> Result<(), RoomError> {
        let round = self.round.as_ref().ok_or(RoomError::InvalidPhase)?;
        if round.card_czar_id != czar_id {
            return Err(RoomError::NotCardCzar);
        }
        if round.phase != RoundPhase::Judging {
            return Err(RoomError::InvalidPhase);
        }
        let submission = match &pick {
            WinnerPick::Player(id) => round.submission_of(id),
            WinnerPick::Card(id) => round.submissions.iter().find(|s| s.card.id == *id),
        }
        .cloned()
        .ok_or(RoomError::NoSubmission)?;

        let player_name = self
            .player(&submission.player_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();
        let winner = Winner {
            player_id: submission.player_id.clone(),
            player_name: player_name.clone(),
            card: submission.card.clone(),
        };

        *self.scores.entry(submission.player_id.clone()).or_insert(0) += 1;
        if let Some(round) = self.round.as_mut() {
            round.winner = Some(winner);
            round.phase = RoundPhase::RoundEnd;
            tracing::info!(
                "Room {} round {} won by {}",
                self.code,
                round.number,
                submission.player_id
            );
        }

        self.channel.publish(ServerMessage::UpdateWinner {
            player_id: submission.player_id,
            player_name,
            card: submission.card,
            scores: self.scores.clone(),
        });
        self.publish_round_update();
        Ok(())
    }

    /// Leave RoundEnd for the next round. `expected_round` guards against
    /// stale triggers from a round that has already moved on.
    pub fn advance_round<R: Rng + ?Sized>(
        &mut self,
        expected_round: Option<u32>,
        catalog: &CardCatalog,
        rng: &mut R,
    ) -> Result<u32, RoomError> {
        let round = self.round.as_ref().ok_or(RoomError::InvalidPhase)?;
        if round.phase != RoundPhase::RoundEnd {
            return Err(RoomError::InvalidPhase);
        }
        if expected_round.is_some_and(|n| n != round.number) {
            return Err(RoomError::InvalidPhase);
        }

        let number = round.number + 1;
        let seat = self.next_czar_seat();
        self.begin_round(number, seat, catalog, rng);
        Ok(number)
    }

    /// Keep the round judgeable after `departed_id` has been removed from the roster
    pub(super) fn handle_departure_mid_round<R: Rng + ?Sized>(
        &mut self,
        departed_id: &str,
        catalog: &CardCatalog,
        rng: &mut R,
    ) {
        let Some(round) = self.round.as_mut() else {
            return;
        };

        if self.players.len() < MIN_PLAYERS_IN_GAME {
            tracing::info!(
                "Room {} has too few players, returning to lobby",
                self.code
            );
            self.round = None;
            self.channel.publish(ServerMessage::GameReset {
                room_code: self.code.clone(),
            });
            return;
        }

        round.hands.remove(departed_id);
        let had_submission = round.submission_of(departed_id).is_some();
        round.submissions.retain(|s| s.player_id != departed_id);

        let czar_left = round.card_czar_id == departed_id;
        let number = round.number;
        let phase = round.phase;
        match phase {
            RoundPhase::Selecting | RoundPhase::Judging if czar_left => {
                tracing::info!(
                    "Card Czar left room {} mid-round, dealing a fresh round",
                    self.code
                );
                let seat = self.next_czar_seat();
                self.begin_round(number + 1, seat, catalog, rng);
            }
            RoundPhase::Judging if round.submissions.is_empty() => {
                tracing::info!(
                    "Room {} lost every submission while judging, dealing a fresh round",
                    self.code
                );
                // Same Czar again; they never got to judge
                let seat = round.czar_seat;
                let czar = round.card_czar_id.clone();
                let seat = self
                    .players
                    .iter()
                    .position(|p| p.id == czar)
                    .unwrap_or(seat);
                self.begin_round(number + 1, seat, catalog, rng);
            }
            RoundPhase::Selecting => {
                let required = self.players.len() - 1;
                if !round.submissions.is_empty() && round.submissions.len() >= required {
                    round.phase = RoundPhase::Judging;
                }
                self.publish_submissions();
                if self.phase() == RoomPhase::Judging {
                    self.publish_round_update();
                }
            }
            RoundPhase::Judging if had_submission => self.publish_submissions(),
            RoundPhase::Judging | RoundPhase::RoundEnd => {}
        }
    }

    fn publish_submissions(&self) {
        self.channel.publish(ServerMessage::UpdateSubmissions {
            submissions: self.submission_views(),
        });
    }

    fn publish_round_update(&self) {
        if let Some(round) = self.round_view(None, false) {
            self.channel.publish(ServerMessage::RoundUpdate { round });
        }
    }
}
