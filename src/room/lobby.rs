//! Membership: join, leave, ready, bots, start, chat, reset

use super::Room;
use crate::catalog::CardCatalog;
use crate::error::RoomError;
use crate::protocol::{JoinPlayer, ServerMessage};
use crate::types::*;
use rand::Rng;

impl Room {
    /// Idempotent by player id: a re-join only re-confirms membership
    pub fn join<R: Rng + ?Sized>(
        &mut self,
        request: JoinPlayer,
        catalog: &CardCatalog,
        rng: &mut R,
    ) -> Result<(), RoomError> {
        let id = request.id.trim().to_string();
        let name = request.name.trim().to_string();
        if id.is_empty() || name.is_empty() {
            return Err(RoomError::UnknownPlayer);
        }

        if let Some(existing) = self.player(&id) {
            // Bot seats are driven by the server only
            if existing.is_bot() {
                return Err(RoomError::UnknownPlayer);
            }
            tracing::debug!("Player {} re-joined room {}", id, self.code);
            self.publish_snapshot_to(&id);
            return Ok(());
        }

        if self.players.len() >= MAX_PLAYERS {
            return Err(RoomError::RoomFull);
        }

        let mut player = Player::human(id.clone(), name, request.avatar);
        player.is_host = self.host().is_none();
        tracing::info!(
            "Player {} joined room {} (host: {})",
            player.id,
            self.code,
            player.is_host
        );
        self.players.push(player);
        self.scores.entry(id.clone()).or_insert(0);

        // Late joiners in Selecting get a hand now so the judging threshold holds
        let dealt = match &mut self.round {
            Some(round) if round.phase == RoundPhase::Selecting => {
                round.hands.insert(id.clone(), catalog.deal_hand(rng, HAND_SIZE));
                true
            }
            _ => false,
        };

        self.publish_roster();
        if dealt {
            if let Some(round) = self.round_view(Some(&id), true) {
                self.channel.publish_to(&id, ServerMessage::StartRound { round });
            }
        } else if self.round.is_some() {
            self.publish_snapshot_to(&id);
        }
        Ok(())
    }

    pub fn leave<R: Rng + ?Sized>(
        &mut self,
        player_id: &str,
        catalog: &CardCatalog,
        rng: &mut R,
    ) -> Result<(), RoomError> {
        let index = self
            .players
            .iter()
            .position(|p| p.id == player_id)
            .ok_or(RoomError::UnknownPlayer)?;

        let departed = self.players.remove(index);
        self.connections.remove(&departed.id);
        tracing::info!("Player {} left room {}", departed.id, self.code);

        if !self.players.iter().any(|p| p.kind == PlayerKind::Human) {
            // Bots don't keep a room alive
            self.players.clear();
            self.connections.clear();
            self.round = None;
            return Ok(());
        }

        if departed.is_host {
            if let Some(next) = self
                .players
                .iter_mut()
                .find(|p| p.kind == PlayerKind::Human)
            {
                next.is_host = true;
                tracing::info!("Player {} is now host of room {}", next.id, self.code);
            }
        }

        self.handle_departure_mid_round(&departed.id, catalog, rng);
        self.publish_roster();
        Ok(())
    }

    /// Hand `player_id`'s seat to `connection`; a later socket replaces an earlier one
    pub fn bind_connection(&mut self, player_id: &str, connection: ConnectionId) {
        if self.is_member(player_id) {
            self.connections.insert(player_id.to_string(), connection);
        }
    }

    /// Whether `connection` is the socket currently playing `player_id`
    pub fn holds_connection(&self, player_id: &str, connection: ConnectionId) -> bool {
        self.connections.get(player_id) == Some(&connection)
    }

    /// No state change if the player is not in the roster
    pub fn set_ready(&mut self, player_id: &str, is_ready: bool) -> Result<(), RoomError> {
        let player = self
            .players
            .iter_mut()
            .find(|p| p.id == player_id)
            .ok_or(RoomError::UnknownPlayer)?;

        player.is_ready = is_ready;
        self.publish_roster();
        Ok(())
    }

    /// Adds the fixed bot roster if no bots are present, otherwise removes all bots
    pub fn toggle_bots(&mut self, requester_id: &str) -> Result<(), RoomError> {
        if !self.is_member(requester_id) {
            return Err(RoomError::UnknownPlayer);
        }
        if self.round.is_some() {
            return Err(RoomError::InvalidPhase);
        }

        if self.players.iter().any(Player::is_bot) {
            self.players.retain(|p| !p.is_bot());
            tracing::info!("Removed bots from room {}", self.code);
        } else {
            let bots: Vec<Player> = BOT_ROSTER
                .iter()
                .filter(|(id, _, _)| !self.is_member(id))
                .map(|(id, name, avatar)| Player::bot(id, name, avatar))
                .collect();
            if self.players.len() + bots.len() > MAX_PLAYERS {
                return Err(RoomError::RoomFull);
            }
            for bot in bots {
                self.scores.entry(bot.id.clone()).or_insert(0);
                self.players.push(bot);
            }
            tracing::info!("Added bots to room {}", self.code);
        }

        self.publish_roster();
        Ok(())
    }

    pub fn start_game<R: Rng + ?Sized>(
        &mut self,
        requester_id: &str,
        catalog: &CardCatalog,
        rng: &mut R,
    ) -> Result<(), RoomError> {
        self.require_host(requester_id)?;
        if self.round.is_some() {
            return Err(RoomError::InvalidPhase);
        }
        if self.players.len() < MIN_PLAYERS_TO_START {
            return Err(RoomError::NotEnoughPlayers(MIN_PLAYERS_TO_START));
        }
        if !self
            .players
            .iter()
            .filter(|p| !p.is_host)
            .all(Player::counts_as_ready)
        {
            return Err(RoomError::PlayersNotReady);
        }

        tracing::info!("Game started in room {}", self.code);
        self.channel.publish(ServerMessage::GameStarted {
            room_code: self.code.clone(),
        });
        self.begin_round(1, 0, catalog, rng);
        Ok(())
    }

    /// Back to the lobby: no round, scores zeroed, humans un-readied
    pub fn reset_game(&mut self, requester_id: &str) -> Result<(), RoomError> {
        self.require_host(requester_id)?;

        self.round = None;
        for score in self.scores.values_mut() {
            *score = 0;
        }
        for player in self.players.iter_mut() {
            if player.kind == PlayerKind::Human && !player.is_host {
                player.is_ready = false;
            }
        }

        tracing::info!("Room {} reset by host", self.code);
        self.channel.publish(ServerMessage::GameReset {
            room_code: self.code.clone(),
        });
        self.publish_roster();
        Ok(())
    }

    /// Append to the chat log and relay verbatim
    pub fn chat(&mut self, sender_id: &str, message: ChatMessage) -> Result<(), RoomError> {
        if !self.is_member(sender_id) || message.player_id != sender_id {
            return Err(RoomError::UnknownPlayer);
        }

        self.chat.push_back(message.clone());
        while self.chat.len() > CHAT_HISTORY_LIMIT {
            self.chat.pop_front();
        }
        self.channel.publish(ServerMessage::ChatMessage { message });
        Ok(())
    }

    pub fn require_host(&self, requester_id: &str) -> Result<(), RoomError> {
        match self.player(requester_id) {
            None => Err(RoomError::UnknownPlayer),
            Some(p) if !p.is_host => Err(RoomError::NotHost),
            Some(_) => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;
    use crate::broadcast::Audience;

    #[test]
    fn test_first_joiner_is_host() {
        let room = room_with(&["h", "p1"]);
        assert!(room.player("h").unwrap().is_host);
        assert!(!room.player("p1").unwrap().is_host);
    }

    #[test]
    fn test_rejoin_does_not_duplicate() {
        let catalog = CardCatalog::builtin();
        let mut room = room_with(&["h", "p1"]);

        for _ in 0..3 {
            room.join(join_player("p1"), &catalog, &mut rng()).unwrap();
            room.join(join_player("h"), &catalog, &mut rng()).unwrap();
        }

        assert_eq!(room.players.len(), 2);
        let ids: Vec<_> = room.players.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["h", "p1"]);
        assert_eq!(room.players.iter().filter(|p| p.is_host).count(), 1);
    }

    #[test]
    fn test_join_rejects_malformed_player() {
        let catalog = CardCatalog::builtin();
        let mut room = room_with(&["h"]);
        let mut request = join_player("p1");
        request.name = "   ".to_string();

        assert_eq!(
            room.join(request, &catalog, &mut rng()),
            Err(RoomError::UnknownPlayer)
        );
        assert_eq!(room.players.len(), 1);
    }

    #[test]
    fn test_room_full_is_rejected_without_broadcast() {
        let catalog = CardCatalog::builtin();
        let ids: Vec<String> = (0..MAX_PLAYERS).map(|i| format!("p{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut room = room_with(&refs);
        let mut rx = room.subscribe();

        let result = room.join(join_player("late"), &catalog, &mut rng());
        assert_eq!(result, Err(RoomError::RoomFull));
        assert_eq!(room.players.len(), MAX_PLAYERS);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_host_leaving_promotes_next_joined() {
        let catalog = CardCatalog::builtin();
        let mut room = room_with(&["h", "p1", "p2"]);

        room.leave("h", &catalog, &mut rng()).unwrap();
        assert!(room.player("p1").unwrap().is_host);
        assert!(!room.player("p2").unwrap().is_host);
    }

    #[test]
    fn test_last_human_leaving_empties_room() {
        let catalog = CardCatalog::builtin();
        let mut room = room_with(&["h"]);
        room.toggle_bots("h").unwrap();
        assert_eq!(room.players.len(), 1 + BOT_ROSTER.len());

        room.leave("h", &catalog, &mut rng()).unwrap();
        assert!(room.is_empty());
    }

    #[test]
    fn test_leave_unknown_player() {
        let catalog = CardCatalog::builtin();
        let mut room = room_with(&["h"]);
        assert_eq!(
            room.leave("ghost", &catalog, &mut rng()),
            Err(RoomError::UnknownPlayer)
        );
    }

    #[test]
    fn test_set_ready_unknown_player_is_noop() {
        let mut room = room_with(&["h", "p1"]);
        let mut rx = room.subscribe();

        assert_eq!(room.set_ready("ghost", true), Err(RoomError::UnknownPlayer));
        assert!(drain(&mut rx).is_empty());

        room.set_ready("p1", true).unwrap();
        assert!(room.player("p1").unwrap().is_ready);
        assert_eq!(drain(&mut rx).len(), 1);
    }

    #[test]
    fn test_toggle_bots_is_a_pure_toggle() {
        let mut room = room_with(&["h", "p1"]);

        room.toggle_bots("h").unwrap();
        assert_eq!(room.players.len(), 2 + BOT_ROSTER.len());
        assert!(room.players.iter().filter(|p| p.is_bot()).all(|p| p.is_ready));

        room.toggle_bots("h").unwrap();
        assert_eq!(room.players.len(), 2);

        room.toggle_bots("h").unwrap();
        assert_eq!(room.players.len(), 2 + BOT_ROSTER.len());
    }

    #[test]
    fn test_toggle_bots_requires_membership() {
        let mut room = room_with(&["h", "p1"]);
        let mut rx = room.subscribe();

        assert_eq!(room.toggle_bots("ghost"), Err(RoomError::UnknownPlayer));
        assert!(room.players.iter().all(|p| !p.is_bot()));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_join_cannot_take_a_bot_seat() {
        let catalog = CardCatalog::builtin();
        let mut room = room_with(&["h", "p1"]);
        room.toggle_bots("h").unwrap();
        let mut rx = room.subscribe();

        assert_eq!(
            room.join(join_player("sean"), &catalog, &mut rng()),
            Err(RoomError::UnknownPlayer)
        );
        let sean = room.player("sean").unwrap();
        assert_eq!(sean.kind, PlayerKind::Bot);
        assert_eq!(room.players.len(), 2 + BOT_ROSTER.len());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_rejoin_only_resyncs_the_rejoiner() {
        let catalog = CardCatalog::builtin();
        let mut room = room_with(&["h", "p1"]);
        let mut rx = room.subscribe();

        room.join(join_player("p1"), &catalog, &mut rng()).unwrap();

        let sent = drain(&mut rx);
        assert!(!sent.is_empty());
        assert!(sent
            .iter()
            .all(|e| e.audience == Audience::Player("p1".to_string())));
    }

    #[test]
    fn test_connection_binding_follows_latest_join() {
        let mut room = room_with(&["h", "p1"]);
        let first = ConnectionId::new();
        let second = ConnectionId::new();

        room.bind_connection("p1", first);
        assert!(room.holds_connection("p1", first));

        room.bind_connection("p1", second);
        assert!(!room.holds_connection("p1", first));
        assert!(room.holds_connection("p1", second));

        // Non-members never get a binding
        room.bind_connection("ghost", first);
        assert!(!room.holds_connection("ghost", first));
    }

    #[test]
    fn test_toggle_bots_respects_capacity() {
        let ids: Vec<String> = (0..MAX_PLAYERS - 2).map(|i| format!("p{}", i)).collect();
        let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let mut room = room_with(&refs);

        assert_eq!(room.toggle_bots("p0"), Err(RoomError::RoomFull));
        assert!(room.players.iter().all(|p| !p.is_bot()));
    }

    #[test]
    fn test_start_game_preconditions() {
        let catalog = CardCatalog::builtin();
        let mut room = room_with(&["h", "p1"]);

        assert_eq!(
            room.start_game("h", &catalog, &mut rng()),
            Err(RoomError::NotEnoughPlayers(MIN_PLAYERS_TO_START))
        );

        room.join(join_player("p2"), &catalog, &mut rng()).unwrap();
        room.set_ready("p1", true).unwrap();
        assert_eq!(
            room.start_game("h", &catalog, &mut rng()),
            Err(RoomError::PlayersNotReady)
        );

        room.set_ready("p2", true).unwrap();
        assert_eq!(
            room.start_game("p1", &catalog, &mut rng()),
            Err(RoomError::NotHost)
        );
        assert!(room.round.is_none());

        room.start_game("h", &catalog, &mut rng()).unwrap();
        assert_eq!(room.phase(), RoomPhase::Selecting);
        assert_eq!(
            room.start_game("h", &catalog, &mut rng()),
            Err(RoomError::InvalidPhase)
        );
    }

    #[test]
    fn test_non_host_start_leaves_room_untouched() {
        let catalog = CardCatalog::builtin();
        let mut room = room_with(&["h", "p1", "p2"]);
        room.set_ready("p1", true).unwrap();
        room.set_ready("p2", true).unwrap();
        let before = room.roster();
        let mut rx = room.subscribe();

        assert_eq!(
            room.start_game("p2", &catalog, &mut rng()),
            Err(RoomError::NotHost)
        );
        assert_eq!(room.phase(), RoomPhase::Lobby);
        assert_eq!(room.roster().len(), before.len());
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_late_joiner_is_dealt_in() {
        let catalog = CardCatalog::builtin();
        let mut room = started_room(&["h", "p1", "p2"]);

        room.join(join_player("late"), &catalog, &mut rng()).unwrap();
        let round = room.round.as_ref().unwrap();
        assert_eq!(round.hands["late"].len(), HAND_SIZE);
    }

    #[test]
    fn test_reset_game_zeroes_scores() {
        let mut room = started_room(&["h", "p1", "p2"]);
        room.scores.insert("p1".to_string(), 3);

        assert_eq!(room.reset_game("p1"), Err(RoomError::NotHost));
        room.reset_game("h").unwrap();

        assert_eq!(room.phase(), RoomPhase::Lobby);
        assert!(room.scores.values().all(|s| *s == 0));
        assert!(!room.player("p1").unwrap().is_ready);
    }

    #[test]
    fn test_chat_is_bounded_and_members_only() {
        let mut room = room_with(&["h", "p1"]);
        let message = |sender: &str, n: usize| ChatMessage {
            id: n.to_string(),
            player_id: sender.to_string(),
            player_name: sender.to_string(),
            text: format!("hello {}", n),
            timestamp: n as i64,
        };

        assert_eq!(
            room.chat("ghost", message("ghost", 0)),
            Err(RoomError::UnknownPlayer)
        );
        assert_eq!(
            room.chat("p1", message("h", 0)),
            Err(RoomError::UnknownPlayer)
        );

        for n in 0..CHAT_HISTORY_LIMIT + 5 {
            room.chat("p1", message("p1", n)).unwrap();
        }
        assert_eq!(room.chat.len(), CHAT_HISTORY_LIMIT);
        assert_eq!(room.chat.front().unwrap().id, "5");
    }
}
