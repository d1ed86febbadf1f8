//! §4.6.8 GameOver: terminal phase. Only `leave_room` or disconnect is
//! accepted; the room's supervisor reaps it after a grace period.

use crate::errors::ActionErrorKind;
use crate::game::GameData;
use crate::net::messages::{ClientAction, ServerEvent};

use super::{HandleOutcome, Phase, PhaseHandler};

#[derive(Debug, Default)]
pub struct GameOver;

impl PhaseHandler for GameOver {
    fn name(&self) -> &'static str {
        "game_over"
    }

    fn on_enter(&mut self, game: &mut GameData) -> (Vec<ServerEvent>, Option<Phase>) {
        let event = ServerEvent::GameEnded {
            winners: game.winners.clone(),
            final_scores: game.player_views(),
        };
        (vec![event], None)
    }

    fn allowed_actions(&self, _game: &GameData, _player_name: &str) -> Vec<&'static str> {
        vec!["leave_room"]
    }

    fn handle(&mut self, player_name: &str, action: &ClientAction, game: &mut GameData) -> HandleOutcome {
        match action {
            ClientAction::LeaveRoom => match game.room.remove_player(player_name) {
                Ok(_) => HandleOutcome::accepted(vec![ServerEvent::RoomUpdate { players: game.player_views() }]),
                Err(e) => HandleOutcome::rejected(e),
            },
            _ => HandleOutcome::rejected(ActionErrorKind::WrongPhase),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::{Room, RoomConfig};
    use crate::rules::StandardRules;
    use std::sync::Arc;

    #[test]
    fn non_leave_action_is_rejected() {
        let mut room = Room::new("ABC123", RoomConfig::default());
        room.add_player("Alice", false).unwrap();
        let mut game = GameData::new(room, Arc::new(StandardRules));
        let mut phase = GameOver;
        let outcome = phase.handle("Alice", &ClientAction::Ping, &mut game);
        assert!(matches!(outcome, HandleOutcome::Rejected(_)));
    }

    #[test]
    fn on_enter_announces_winners() {
        let room = Room::new("ABC123", RoomConfig::default());
        let mut game = GameData::new(room, Arc::new(StandardRules));
        game.winners = vec!["Alice".into()];
        let mut phase = GameOver;
        let (events, _) = phase.on_enter(&mut game);
        assert!(matches!(&events[0], ServerEvent::GameEnded { winners, .. } if winners == &vec!["Alice".to_string()]));
    }
}
