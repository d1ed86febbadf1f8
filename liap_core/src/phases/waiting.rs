//! §4.6.1 Waiting: the lobby phase, before a game has started.

use crate::errors::ActionErrorKind;
use crate::game::GameData;
use crate::net::messages::{ClientAction, ServerEvent};
use crate::room::SEAT_COUNT;

use super::{HandleOutcome, Phase, PhaseHandler, Preparation};

#[derive(Debug, Default, Clone, Copy)]
pub struct Waiting;

impl PhaseHandler for Waiting {
    fn name(&self) -> &'static str {
        "waiting"
    }

    fn on_enter(&mut self, _game: &mut GameData) -> (Vec<ServerEvent>, Option<Phase>) {
        (Vec::new(), None)
    }

    fn allowed_actions(&self, game: &GameData, player_name: &str) -> Vec<&'static str> {
        let mut actions = vec!["leave_room", "join_room"];
        if game.room.is_host(player_name) {
            actions.push("add_bot");
            actions.push("remove_player");
            actions.push("start_game");
        }
        actions
    }

    fn handle(&mut self, player_name: &str, action: &ClientAction, game: &mut GameData) -> HandleOutcome {
        match action {
            ClientAction::JoinRoom { .. } => match game.room.add_player(player_name, false) {
                Ok(seat) => HandleOutcome::accepted(vec![
                    ServerEvent::RoomJoined { room_id: game.room.room_id.clone(), seat },
                    ServerEvent::RoomUpdate { players: game.player_views() },
                ]),
                Err(e) => HandleOutcome::rejected(e),
            },
            ClientAction::AddBot { slot } => {
                if !game.room.is_host(player_name) {
                    return HandleOutcome::rejected(ActionErrorKind::NotHost);
                }
                if *slot >= SEAT_COUNT {
                    return HandleOutcome::rejected(ActionErrorKind::InvalidRequest);
                }
                let bot_name = next_bot_name(game);
                match game.room.add_bot_at(*slot, &bot_name) {
                    Ok(()) => HandleOutcome::accepted(vec![ServerEvent::RoomUpdate {
                        players: game.player_views(),
                    }]),
                    Err(e) => HandleOutcome::rejected(e),
                }
            }
            ClientAction::RemovePlayer { name } => {
                if !game.room.is_host(player_name) {
                    return HandleOutcome::rejected(ActionErrorKind::NotHost);
                }
                if name == player_name {
                    return HandleOutcome::rejected(ActionErrorKind::InvalidRequest);
                }
                match game.room.remove_player(name) {
                    Ok(_) => HandleOutcome::accepted(vec![ServerEvent::RoomUpdate {
                        players: game.player_views(),
                    }]),
                    Err(e) => HandleOutcome::rejected(e),
                }
            }
            ClientAction::LeaveRoom => {
                let (_, was_host) = match game.room.remove_player(player_name) {
                    Ok(v) => v,
                    Err(e) => return HandleOutcome::rejected(e),
                };
                let mut events = vec![ServerEvent::RoomUpdate { players: game.player_views() }];
                if was_host {
                    let new_host = game.room.migrate_host();
                    events.push(ServerEvent::HostChanged { old: Some(player_name.to_string()), new: new_host });
                }
                HandleOutcome::accepted(events)
            }
            ClientAction::StartGame => {
                if !game.room.is_host(player_name) {
                    return HandleOutcome::rejected(ActionErrorKind::NotHost);
                }
                if game.room.occupied_count() != SEAT_COUNT {
                    return HandleOutcome::rejected(ActionErrorKind::NeedFourPlayers);
                }
                game.room.started = true;
                HandleOutcome::transition(Vec::new(), Phase::Preparation(Preparation::default()))
            }
            _ => HandleOutcome::rejected(ActionErrorKind::WrongPhase),
        }
    }
}

fn next_bot_name(game: &GameData) -> String {
    let mut n = 1;
    loop {
        let candidate = format!("Bot{n}");
        if !game.room.seats.iter().any(|s| s.name.as_deref() == Some(candidate.as_str())) {
            return candidate;
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::{Room, RoomConfig};
    use crate::rules::StandardRules;
    use std::sync::Arc;

    fn game_with_players(n: usize) -> GameData {
        let mut room = Room::new("ABC123", RoomConfig::default());
        for i in 0..n {
            room.add_player(&format!("P{i}"), false).unwrap();
        }
        GameData::new(room, Arc::new(StandardRules))
    }

    #[test]
    fn start_game_with_four_seats_transitions_to_preparation() {
        let mut game = game_with_players(4);
        let mut waiting = Waiting;
        let outcome = waiting.handle("P0", &ClientAction::StartGame, &mut game);
        match outcome {
            HandleOutcome::Accepted { next_phase, .. } => {
                assert!(matches!(next_phase, Some(Phase::Preparation(_))));
            }
            HandleOutcome::Rejected(_) => panic!("expected accept"),
        }
    }

    #[test]
    fn start_game_with_three_seats_is_rejected() {
        let mut game = game_with_players(3);
        let mut waiting = Waiting;
        let outcome = waiting.handle("P0", &ClientAction::StartGame, &mut game);
        match outcome {
            HandleOutcome::Rejected(e) => assert_eq!(e.kind, ActionErrorKind::NeedFourPlayers),
            _ => panic!("expected rejection"),
        }
    }

    #[test]
    fn start_game_by_non_host_is_rejected() {
        let mut game = game_with_players(4);
        let mut waiting = Waiting;
        let outcome = waiting.handle("P1", &ClientAction::StartGame, &mut game);
        match outcome {
            HandleOutcome::Rejected(e) => assert_eq!(e.kind, ActionErrorKind::NotHost),
            _ => panic!("expected rejection"),
        }
    }

    #[test]
    fn add_bot_by_non_host_is_rejected() {
        let mut game = game_with_players(1);
        let mut waiting = Waiting;
        let outcome = waiting.handle("Ghost", &ClientAction::AddBot { slot: 1 }, &mut game);
        match outcome {
            HandleOutcome::Rejected(e) => assert_eq!(e.kind, ActionErrorKind::NotHost),
            _ => panic!("expected rejection"),
        }
    }

    #[test]
    fn add_bot_fills_the_requested_slot() {
        let mut game = game_with_players(1);
        let mut waiting = Waiting;
        let outcome = waiting.handle("P0", &ClientAction::AddBot { slot: 1 }, &mut game);
        assert!(matches!(outcome, HandleOutcome::Accepted { .. }));
        assert!(game.room.seats[1].is_bot);
    }

    #[test]
    fn join_room_seats_a_second_player() {
        let mut game = game_with_players(1);
        let mut waiting = Waiting;
        let outcome = waiting.handle("P1", &ClientAction::JoinRoom { room_id: "ABC123".into(), player_name: "P1".into() }, &mut game);
        match outcome {
            HandleOutcome::Accepted { events, .. } => {
                assert!(events.iter().any(|e| matches!(e, ServerEvent::RoomJoined { seat, .. } if *seat == 1)));
            }
            HandleOutcome::Rejected(_) => panic!("expected accept"),
        }
    }

    #[test]
    fn join_room_rejects_duplicate_name() {
        let mut game = game_with_players(1);
        let mut waiting = Waiting;
        let outcome = waiting.handle("P0", &ClientAction::JoinRoom { room_id: "ABC123".into(), player_name: "P0".into() }, &mut game);
        match outcome {
            HandleOutcome::Rejected(e) => assert_eq!(e.kind, ActionErrorKind::NameTaken),
            _ => panic!("expected rejection"),
        }
    }

    #[test]
    fn leave_room_by_host_triggers_migration() {
        let mut game = game_with_players(2);
        let mut waiting = Waiting;
        let outcome = waiting.handle("P0", &ClientAction::LeaveRoom, &mut game);
        match outcome {
            HandleOutcome::Accepted { events, .. } => {
                assert!(events.iter().any(|e| matches!(e, ServerEvent::HostChanged { .. })));
            }
            _ => panic!("expected accept"),
        }
        assert_eq!(game.room.host_name.as_deref(), Some("P1"));
    }
}
