//! §4.6.3 RoundStart: a fixed cinematic pause before declarations begin.

use std::time::Duration;

use crate::errors::ActionErrorKind;
use crate::game::GameData;
use crate::net::messages::{ClientAction, PhaseData, ServerEvent};

use super::{Declaration, HandleOutcome, Phase, PhaseHandler};

#[derive(Debug, Default)]
pub struct RoundStart;

impl PhaseHandler for RoundStart {
    fn name(&self) -> &'static str {
        "round_start"
    }

    fn on_enter(&mut self, game: &mut GameData) -> (Vec<ServerEvent>, Option<Phase>) {
        let starter_name = game.turn_starter.and_then(|i| game.seat_name(i)).map(str::to_string);
        let event = ServerEvent::PhaseChange {
            phase: "round_start".into(),
            phase_data: PhaseData {
                starter: starter_name,
                ..game.base_phase_data()
            },
            round_number: game.room.round_number,
            turn_number: game.room.turn_number,
        };
        (vec![event], None)
    }

    fn allowed_actions(&self, _game: &GameData, _player_name: &str) -> Vec<&'static str> {
        vec!["leave_room"]
    }

    fn handle(&mut self, _player_name: &str, _action: &ClientAction, _game: &mut GameData) -> HandleOutcome {
        HandleOutcome::rejected(ActionErrorKind::WrongPhase)
    }

    fn timer(&self) -> Option<Duration> {
        Some(Duration::from_secs(5))
    }

    fn on_timer(&mut self, game: &mut GameData) -> HandleOutcome {
        let event = ServerEvent::PhaseChange {
            phase: "declaration".into(),
            phase_data: game.base_phase_data(),
            round_number: game.room.round_number,
            turn_number: game.room.turn_number,
        };
        HandleOutcome::transition(vec![event], Phase::Declaration(Declaration::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::{Room, RoomConfig};
    use crate::rules::StandardRules;
    use std::sync::Arc;

    #[test]
    fn timer_is_five_seconds() {
        assert_eq!(RoundStart.timer(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn on_timer_transitions_to_declaration() {
        let room = Room::new("ABC123", RoomConfig::default());
        let mut game = GameData::new(room, Arc::new(StandardRules));
        let mut phase = RoundStart;
        let outcome = phase.on_timer(&mut game);
        match outcome {
            HandleOutcome::Accepted { next_phase, .. } => {
                assert!(matches!(next_phase, Some(Phase::Declaration(_))));
            }
            _ => panic!("expected accept"),
        }
    }

    #[test]
    fn no_player_action_is_accepted_during_round_start() {
        let room = Room::new("ABC123", RoomConfig::default());
        let mut game = GameData::new(room, Arc::new(StandardRules));
        let mut phase = RoundStart;
        let outcome = phase.handle("Alice", &ClientAction::Ping, &mut game);
        assert!(matches!(outcome, HandleOutcome::Rejected(_)));
    }
}
