//! `GameData`: a `Room` plus the turn-scoped state that only exists
//! while a `GameStateMachine` is driving it (§3 GameState snapshot,
//! §4.6). Phases read and mutate this directly; nothing else does.

use std::collections::HashMap;
use std::sync::Arc;

use crate::net::messages::{PhaseData, PlayEntryView, PlayerView};
use crate::room::{PlayEntry, Room, RoomConfig};
use crate::rules::{Hand, RulesEngine};

pub struct GameData {
    pub room: Room,
    pub rules: Arc<dyn RulesEngine>,
    pub seq: i64,

    // Turn-scoped transient state (§4.6.5, §4.6.6).
    pub current_plays: Vec<PlayEntry>,
    pub required_piece_count: Option<usize>,
    pub turn_starter: Option<usize>,
    pub current_player: Option<usize>,
    pub current_declarer: Option<usize>,
    pub redeal_offer_seat: Option<usize>,
    pub turn_winner: Option<usize>,
    pub winners: Vec<String>,
    /// Carried from TurnResults/Preparation's redeal handling into the
    /// next Preparation entry (§4.6.2 rule 2).
    pub next_round_starter_seat: Option<usize>,
}

impl GameData {
    pub fn new(room: Room, rules: Arc<dyn RulesEngine>) -> Self {
        Self {
            room,
            rules,
            seq: 0,
            current_plays: Vec::new(),
            required_piece_count: None,
            turn_starter: None,
            current_player: None,
            current_declarer: None,
            redeal_offer_seat: None,
            turn_winner: None,
            winners: Vec::new(),
            next_round_starter_seat: None,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.room.config
    }

    pub fn next_sequence(&mut self) -> i64 {
        self.seq += 1;
        self.seq
    }

    pub fn seat_name(&self, idx: usize) -> Option<&str> {
        self.room.seats.get(idx).and_then(|s| s.name.as_deref())
    }

    pub fn next_seat_index(&self, idx: usize) -> usize {
        (idx + 1) % self.room.seats.len()
    }

    pub fn player_views(&self) -> Vec<PlayerView> {
        self.room
            .seats
            .iter()
            .filter_map(|s| {
                s.name.as_ref().map(|name| PlayerView {
                    name: name.clone(),
                    is_bot: s.is_bot,
                    is_connected: s.is_connected,
                    score: s.score,
                    hand_size: s.hand.len(),
                    captured_piles: s.captured_piles,
                    declared: s.declared,
                    zero_declares_in_a_row: s.zero_declares_in_a_row,
                })
            })
            .collect()
    }

    pub fn base_phase_data(&self) -> PhaseData {
        PhaseData {
            players: self.player_views(),
            ..Default::default()
        }
    }

    pub fn current_plays_view(&self) -> Vec<PlayEntryView> {
        self.current_plays
            .iter()
            .filter_map(|entry| {
                self.seat_name(entry.seat).map(|name| PlayEntryView {
                    player_name: name.to_string(),
                    pieces: entry.pieces.clone(),
                })
            })
            .collect()
    }

    /// An immutable view of the whole game, the only thing `BotActor`
    /// and read-only HTTP surfaces are handed (§9 handle indirection).
    pub fn snapshot(&self) -> GameSnapshot {
        let bot_hands = self
            .room
            .seats
            .iter()
            .filter(|s| s.is_bot)
            .filter_map(|s| s.name.as_ref().map(|name| (name.clone(), s.hand.clone())))
            .collect();
        GameSnapshot {
            room_id: self.room.room_id.clone(),
            round_number: self.room.round_number,
            turn_number: self.room.turn_number,
            redeal_multiplier: self.room.redeal_multiplier,
            players: self.player_views(),
            current_plays: self.current_plays_view(),
            required_piece_count: self.required_piece_count,
            current_player: self.current_player.and_then(|i| self.seat_name(i)).map(str::to_string),
            current_declarer: self.current_declarer.and_then(|i| self.seat_name(i)).map(str::to_string),
            redeal_offer_to: self.redeal_offer_seat.and_then(|i| self.seat_name(i)).map(str::to_string),
            bot_hands,
        }
    }
}

/// A read-only, owned snapshot of game state — what `RoomHandle` and
/// `BotActor` see instead of a live reference (§9).
#[derive(Debug, Clone)]
pub struct GameSnapshot {
    pub room_id: String,
    pub round_number: u32,
    pub turn_number: u32,
    pub redeal_multiplier: u32,
    pub players: Vec<PlayerView>,
    pub current_plays: Vec<PlayEntryView>,
    pub required_piece_count: Option<usize>,
    pub current_player: Option<String>,
    pub current_declarer: Option<String>,
    pub redeal_offer_to: Option<String>,
    /// Hands for bot-controlled seats only, so `BotActor` can choose a
    /// legal play without holding a live reference into `GameData`
    /// (§9: handle indirection, no back-pointers). Human hands stay
    /// private to their own connection.
    pub bot_hands: HashMap<String, Hand>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomConfig;
    use crate::rules::StandardRules;

    fn game() -> GameData {
        let mut room = Room::new("ABC123", RoomConfig::default());
        room.add_player("Alice", false).unwrap();
        room.add_player("Bob", false).unwrap();
        GameData::new(room, Arc::new(StandardRules))
    }

    #[test]
    fn next_sequence_is_monotonic_starting_at_one() {
        let mut g = game();
        assert_eq!(g.next_sequence(), 1);
        assert_eq!(g.next_sequence(), 2);
    }

    #[test]
    fn player_views_only_include_occupied_seats() {
        let g = game();
        assert_eq!(g.player_views().len(), 2);
    }

    #[test]
    fn next_seat_index_wraps_around() {
        let g = game();
        assert_eq!(g.next_seat_index(3), 0);
    }
}
