//! §4.6.5 Turn: one cycle of four plays. The first play of the turn
//! latches the required piece count for the rest.

use std::collections::HashSet;

use crate::errors::ActionErrorKind;
use crate::game::GameData;
use crate::net::messages::{ClientAction, PhaseData, ServerEvent};
use crate::room::PlayEntry;
use crate::rules::HAND_SIZE;

use super::{HandleOutcome, Phase, PhaseHandler, TurnResults};

#[derive(Debug, Default)]
pub struct Turn;

impl Turn {
    fn turn_phase_event(&self, game: &GameData) -> ServerEvent {
        ServerEvent::PhaseChange {
            phase: "turn".into(),
            phase_data: PhaseData {
                current_plays: Some(game.current_plays_view()),
                required_piece_count: game.required_piece_count,
                current_player: game.current_player.and_then(|i| game.seat_name(i)).map(str::to_string),
                ..game.base_phase_data()
            },
            round_number: game.room.round_number,
            turn_number: game.room.turn_number,
        }
    }
}

impl PhaseHandler for Turn {
    fn name(&self) -> &'static str {
        "turn"
    }

    fn on_enter(&mut self, game: &mut GameData) -> (Vec<ServerEvent>, Option<Phase>) {
        game.room.turn_number += 1;
        game.current_plays.clear();
        game.required_piece_count = None;
        game.current_player = if game.room.turn_number == 1 {
            game.turn_starter
        } else {
            game.turn_winner
        };
        (vec![self.turn_phase_event(game)], None)
    }

    fn allowed_actions(&self, _game: &GameData, _player_name: &str) -> Vec<&'static str> {
        vec!["play", "leave_room"]
    }

    fn handle(&mut self, player_name: &str, action: &ClientAction, game: &mut GameData) -> HandleOutcome {
        let ClientAction::Play { indices } = action else {
            return HandleOutcome::rejected(ActionErrorKind::WrongPhase);
        };
        let Some(current) = game.current_player else {
            return HandleOutcome::rejected(ActionErrorKind::WrongPhase);
        };
        if game.seat_name(current) != Some(player_name) {
            return HandleOutcome::rejected(ActionErrorKind::NotYourTurn);
        }

        let hand_len = game.room.seats[current].hand.len();
        let unique: HashSet<usize> = indices.iter().copied().collect();
        if unique.len() != indices.len()
            || indices.is_empty()
            || indices.len() > HAND_SIZE
            || indices.iter().any(|&i| i >= hand_len)
        {
            return HandleOutcome::rejected(ActionErrorKind::InvalidPieces);
        }

        match game.required_piece_count {
            None => game.required_piece_count = Some(indices.len()),
            Some(required) if required != indices.len() => {
                return HandleOutcome::rejected(ActionErrorKind::WrongPieceCount);
            }
            _ => {}
        }

        let play: Vec<_> = indices.iter().map(|&i| game.room.seats[current].hand[i]).collect();
        let mut to_remove: Vec<usize> = indices.clone();
        to_remove.sort_unstable_by(|a, b| b.cmp(a));
        for idx in to_remove {
            game.room.seats[current].hand.remove(idx);
        }
        game.current_plays.push(PlayEntry { seat: current, pieces: play });

        // Broadcast the updated plays before deciding whether the turn
        // is complete (§9 broadcast ordering fix).
        let mut events = vec![self.turn_phase_event(game)];

        if game.current_plays.len() == 4 {
            let results_event = ServerEvent::PhaseChange {
                phase: "turn_results".into(),
                phase_data: game.base_phase_data(),
                round_number: game.room.round_number,
                turn_number: game.room.turn_number,
            };
            events.push(results_event);
            return HandleOutcome::transition(events, Phase::TurnResults(TurnResults::default()));
        }

        game.current_player = Some(game.next_seat_index(current));
        HandleOutcome::accepted(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::{Room, RoomConfig};
    use crate::rules::{Color, Piece, PieceKind, StandardRules};
    use std::sync::Arc;

    fn game_ready() -> GameData {
        let mut room = Room::new("ABC123", RoomConfig::default());
        for name in ["Alice", "Bob", "Cara", "Dan"] {
            room.add_player(name, false).unwrap();
        }
        for seat in room.seats.iter_mut() {
            seat.hand = vec![
                Piece::new(PieceKind::Soldier, Color::Red, 1),
                Piece::new(PieceKind::Soldier, Color::Black, 1),
            ];
        }
        let mut game = GameData::new(room, Arc::new(StandardRules));
        game.turn_starter = Some(0);
        game
    }

    #[test]
    fn first_play_latches_required_piece_count() {
        let mut game = game_ready();
        let mut phase = Turn;
        phase.on_enter(&mut game);
        phase.handle("Alice", &ClientAction::Play { indices: vec![0] }, &mut game);
        assert_eq!(game.required_piece_count, Some(1));
    }

    #[test]
    fn mismatched_piece_count_is_rejected() {
        let mut game = game_ready();
        let mut phase = Turn;
        phase.on_enter(&mut game);
        phase.handle("Alice", &ClientAction::Play { indices: vec![0] }, &mut game);
        let outcome = phase.handle("Bob", &ClientAction::Play { indices: vec![0, 1] }, &mut game);
        match outcome {
            HandleOutcome::Rejected(e) => assert_eq!(e.kind, ActionErrorKind::WrongPieceCount),
            _ => panic!("expected rejection"),
        }
    }

    #[test]
    fn duplicate_indices_are_rejected() {
        let mut game = game_ready();
        let mut phase = Turn;
        phase.on_enter(&mut game);
        let outcome = phase.handle("Alice", &ClientAction::Play { indices: vec![0, 0] }, &mut game);
        match outcome {
            HandleOutcome::Rejected(e) => assert_eq!(e.kind, ActionErrorKind::InvalidPieces),
            _ => panic!("expected rejection"),
        }
    }

    #[test]
    fn non_current_player_is_rejected() {
        let mut game = game_ready();
        let mut phase = Turn;
        phase.on_enter(&mut game);
        let outcome = phase.handle("Bob", &ClientAction::Play { indices: vec![0] }, &mut game);
        match outcome {
            HandleOutcome::Rejected(e) => assert_eq!(e.kind, ActionErrorKind::NotYourTurn),
            _ => panic!("expected rejection"),
        }
    }

    #[test]
    fn fourth_play_transitions_to_turn_results() {
        let mut game = game_ready();
        let mut phase = Turn;
        phase.on_enter(&mut game);
        phase.handle("Alice", &ClientAction::Play { indices: vec![0] }, &mut game);
        phase.handle("Bob", &ClientAction::Play { indices: vec![0] }, &mut game);
        phase.handle("Cara", &ClientAction::Play { indices: vec![0] }, &mut game);
        let outcome = phase.handle("Dan", &ClientAction::Play { indices: vec![0] }, &mut game);
        match outcome {
            HandleOutcome::Accepted { next_phase, .. } => {
                assert!(matches!(next_phase, Some(Phase::TurnResults(_))));
            }
            _ => panic!("expected accept"),
        }
    }

    #[test]
    fn play_removes_pieces_from_hand() {
        let mut game = game_ready();
        let mut phase = Turn;
        phase.on_enter(&mut game);
        phase.handle("Alice", &ClientAction::Play { indices: vec![0] }, &mut game);
        assert_eq!(game.room.seats[0].hand.len(), 1);
    }
}
