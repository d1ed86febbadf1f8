//! §4.6.6 TurnResults: resolve the turn's winner, then hold for the
//! client-driven (or server-timeout) animation-complete signal.

use std::time::Duration;

use crate::errors::ActionErrorKind;
use crate::game::GameData;
use crate::net::messages::{ClientAction, ServerEvent};
use crate::room::TurnRecord;
use crate::rules::Comparison;

use super::{HandleOutcome, Phase, PhaseHandler, Scoring, Turn};

#[derive(Debug, Default)]
pub struct TurnResults;

impl TurnResults {
    fn resolve_winner(game: &GameData) -> usize {
        let first = &game.current_plays[0];
        let mut winner = first.seat;
        let mut best_pieces = first.pieces.clone();
        for entry in game.current_plays.iter().skip(1) {
            if game.rules.compare(&entry.pieces, &best_pieces) == Comparison::AWins {
                winner = entry.seat;
                best_pieces = entry.pieces.clone();
            }
        }
        winner
    }
}

impl PhaseHandler for TurnResults {
    fn name(&self) -> &'static str {
        "turn_results"
    }

    fn on_enter(&mut self, game: &mut GameData) -> (Vec<ServerEvent>, Option<Phase>) {
        let winner = Self::resolve_winner(game);
        let required = game.required_piece_count.unwrap_or(0) as u32;
        game.room.seats[winner].captured_piles += required;
        game.turn_winner = Some(winner);
        game.room.turn_history_this_round.push(TurnRecord {
            turn_number: game.room.turn_number,
            starter_seat: game.turn_starter.unwrap_or(winner),
            required_piece_count: required as usize,
            winner_seat: winner,
        });

        let winner_name = game.seat_name(winner).map(str::to_string).unwrap_or_default();
        let event = ServerEvent::TurnResolved {
            winner: winner_name,
            captured_piles: required,
        };
        (vec![event], None)
    }

    fn allowed_actions(&self, game: &GameData, player_name: &str) -> Vec<&'static str> {
        if game.turn_winner.and_then(|i| game.seat_name(i)) == Some(player_name) {
            vec!["animation_complete"]
        } else {
            vec![]
        }
    }

    fn handle(&mut self, player_name: &str, action: &ClientAction, game: &mut GameData) -> HandleOutcome {
        if !matches!(action, ClientAction::AnimationComplete) {
            return HandleOutcome::rejected(ActionErrorKind::WrongPhase);
        }
        if game.turn_winner.and_then(|i| game.seat_name(i)) != Some(player_name) {
            return HandleOutcome::rejected(ActionErrorKind::NotYourTurn);
        }
        self.advance(game)
    }

    fn timer(&self) -> Option<Duration> {
        Some(Duration::from_secs(3))
    }

    fn on_timer(&mut self, game: &mut GameData) -> HandleOutcome {
        self.advance(game)
    }
}

impl TurnResults {
    fn advance(&self, game: &mut GameData) -> HandleOutcome {
        let any_hand_left = game.room.seats.iter().any(|s| !s.hand.is_empty());
        if any_hand_left {
            let event = ServerEvent::PhaseChange {
                phase: "turn".into(),
                phase_data: game.base_phase_data(),
                round_number: game.room.round_number,
                turn_number: game.room.turn_number,
            };
            HandleOutcome::transition(vec![event], Phase::Turn(Turn::default()))
        } else {
            game.next_round_starter_seat = game.turn_winner;
            let event = ServerEvent::PhaseChange {
                phase: "scoring".into(),
                phase_data: game.base_phase_data(),
                round_number: game.room.round_number,
                turn_number: game.room.turn_number,
            };
            HandleOutcome::transition(vec![event], Phase::Scoring(Scoring::default()))
        }
    }
}
