//! §4.6.4 Declaration: each seat bids how many piles it expects to
//! capture this round, starting seat first then clockwise.

use crate::errors::ActionErrorKind;
use crate::game::GameData;
use crate::net::messages::{ClientAction, ServerEvent};
use crate::room::SEAT_COUNT;

use super::{HandleOutcome, Phase, PhaseHandler, Turn};

#[derive(Debug, Default)]
pub struct Declaration;

impl PhaseHandler for Declaration {
    fn name(&self) -> &'static str {
        "declaration"
    }

    fn on_enter(&mut self, game: &mut GameData) -> (Vec<ServerEvent>, Option<Phase>) {
        for seat in game.room.seats.iter_mut() {
            seat.declared = None;
        }
        game.current_declarer = game.turn_starter;
        let event = ServerEvent::PhaseChange {
            phase: "declaration".into(),
            phase_data: game.base_phase_data(),
            round_number: game.room.round_number,
            turn_number: game.room.turn_number,
        };
        (vec![event], None)
    }

    fn allowed_actions(&self, _game: &GameData, _player_name: &str) -> Vec<&'static str> {
        vec!["declare", "leave_room"]
    }

    fn handle(&mut self, player_name: &str, action: &ClientAction, game: &mut GameData) -> HandleOutcome {
        let ClientAction::Declare { value } = action else {
            return HandleOutcome::rejected(ActionErrorKind::WrongPhase);
        };
        let Some(current) = game.current_declarer else {
            return HandleOutcome::rejected(ActionErrorKind::WrongPhase);
        };
        if game.seat_name(current) != Some(player_name) {
            return HandleOutcome::rejected(ActionErrorKind::NotYourTurn);
        }
        if *value > 8 {
            return HandleOutcome::rejected(ActionErrorKind::InvalidRequest);
        }

        let declared_so_far: u8 = game
            .room
            .seats
            .iter()
            .filter_map(|s| s.declared)
            .sum();
        let declared_count = game.room.seats.iter().filter(|s| s.declared.is_some()).count();
        let is_last_declarer = declared_count == SEAT_COUNT - 1;
        if is_last_declarer && declared_so_far + value == 8 {
            return HandleOutcome::rejected(ActionErrorKind::TotalCannotEqual8);
        }
        if *value == 0 && game.room.seats[current].zero_declares_in_a_row == 2 {
            return HandleOutcome::rejected(ActionErrorKind::NoThirdConsecutiveZero);
        }

        game.room.seats[current].declared = Some(*value);
        game.room.seats[current].zero_declares_in_a_row = if *value == 0 {
            game.room.seats[current].zero_declares_in_a_row + 1
        } else {
            0
        };

        let mut events = vec![ServerEvent::RoomUpdate { players: game.player_views() }];
        if declared_count + 1 == SEAT_COUNT {
            let turn_event = ServerEvent::PhaseChange {
                phase: "turn".into(),
                phase_data: game.base_phase_data(),
                round_number: game.room.round_number,
                turn_number: game.room.turn_number,
            };
            events.push(turn_event);
            return HandleOutcome::transition(events, Phase::Turn(Turn::default()));
        }
        game.current_declarer = Some(game.next_seat_index(current));
        HandleOutcome::accepted(events)
    }
}
