//! §4.6.7 Scoring: apply the round's scores, then either end the game
//! or loop back to Preparation for another round.

use crate::game::GameData;
use crate::net::messages::{ClientAction, ServerEvent};
use crate::errors::ActionErrorKind;

use super::{GameOver, HandleOutcome, Phase, PhaseHandler, Preparation};

#[derive(Debug, Default)]
pub struct Scoring;

impl PhaseHandler for Scoring {
    fn name(&self) -> &'static str {
        "scoring"
    }

    fn on_enter(&mut self, game: &mut GameData) -> (Vec<ServerEvent>, Option<Phase>) {
        let multiplier = game.room.redeal_multiplier;
        for seat in game.room.seats.iter_mut() {
            if seat.is_occupied() {
                let declared = seat.declared.unwrap_or(0);
                let round_score = game.rules.score(declared, seat.captured_piles, multiplier);
                seat.score += round_score;
            }
        }
        game.room.redeal_multiplier = 1;

        let scores = game.player_views();
        let mut events = vec![
            ServerEvent::ScoreUpdate { scores: scores.clone() },
            ServerEvent::RoundComplete { scores: scores.clone() },
        ];

        let game_over = game
            .room
            .seats
            .iter()
            .any(|s| s.score >= game.config().score_to_win)
            || game.room.round_number >= game.config().max_rounds;

        if game_over {
            let top_score = game.room.seats.iter().filter(|s| s.is_occupied()).map(|s| s.score).max().unwrap_or(0);
            game.winners = game
                .room
                .seats
                .iter()
                .filter(|s| s.is_occupied() && s.score == top_score)
                .filter_map(|s| s.name.clone())
                .collect();
            events.push(ServerEvent::GameEnded {
                winners: game.winners.clone(),
                final_scores: scores,
            });
            return (events, Some(Phase::GameOver(GameOver::default())));
        }

        let prep_event = ServerEvent::PhaseChange {
            phase: "preparation".into(),
            phase_data: game.base_phase_data(),
            round_number: game.room.round_number,
            turn_number: game.room.turn_number,
        };
        events.push(prep_event);
        (events, Some(Phase::Preparation(Preparation::default())))
    }

    fn allowed_actions(&self, _game: &GameData, _player_name: &str) -> Vec<&'static str> {
        vec!["leave_room"]
    }

    fn handle(&mut self, _player_name: &str, _action: &ClientAction, _game: &mut GameData) -> HandleOutcome {
        HandleOutcome::rejected(ActionErrorKind::WrongPhase)
    }
}
