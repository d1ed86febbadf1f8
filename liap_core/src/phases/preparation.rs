//! §4.6.2 Preparation: deal, determine the round starter, offer redeals
//! on weak hands.

use std::collections::VecDeque;

use rand::rng;

use crate::errors::ActionErrorKind;
use crate::game::GameData;
use crate::net::messages::{ClientAction, PhaseData, ServerEvent};
use crate::room::SEAT_COUNT;
use crate::rules::{self, deal};

use super::{HandleOutcome, Phase, PhaseHandler, RoundStart};

#[derive(Debug, Default)]
pub struct Preparation {
    /// Lowest-slot-first queue of seats with a weak hand still to be
    /// offered a redeal.
    pending_offers: VecDeque<usize>,
}

impl Preparation {
    fn deal_and_detect_weak(&mut self, game: &mut GameData) {
        let hands = deal(&mut rng());
        for (seat, hand) in game.room.seats.iter_mut().zip(hands) {
            seat.hand = hand;
        }
        self.pending_offers = (0..SEAT_COUNT)
            .filter(|&i| game.rules.is_weak(&game.room.seats[i].hand))
            .collect();
    }

    fn determine_starter(&self, game: &GameData) -> usize {
        if game.room.round_number == 1 && rules::STARTER_RULE_APPLIES_ROUND_ONE_ONLY {
            let holders: Vec<usize> = (0..SEAT_COUNT)
                .filter(|&i| game.room.seats[i].hand.iter().any(|p| p.is_red_general()))
                .collect();
            if holders.len() == 1 {
                return holders[0];
            }
            return 0;
        }
        game.next_round_starter_seat.unwrap_or(0)
    }

    fn phase_data(&self, game: &GameData) -> PhaseData {
        PhaseData {
            redeal_offer_to: self
                .pending_offers
                .front()
                .and_then(|&i| game.seat_name(i))
                .map(str::to_string),
            ..game.base_phase_data()
        }
    }

    fn enter_event(&self, game: &GameData) -> ServerEvent {
        ServerEvent::PhaseChange {
            phase: "preparation".into(),
            phase_data: self.phase_data(game),
            round_number: game.room.round_number,
            turn_number: game.room.turn_number,
        }
    }
}

impl PhaseHandler for Preparation {
    fn name(&self) -> &'static str {
        "preparation"
    }

    fn on_enter(&mut self, game: &mut GameData) -> (Vec<ServerEvent>, Option<Phase>) {
        game.room.round_number += 1;
        game.room.turn_number = 0;
        game.room.turn_history_this_round.clear();
        for seat in game.room.seats.iter_mut() {
            seat.reset_for_new_round();
            seat.zero_declares_in_a_row = 0;
        }
        self.deal_and_detect_weak(game);
        let starter = self.determine_starter(game);
        game.turn_starter = Some(starter);
        game.next_round_starter_seat = None;

        let mut events = vec![self.enter_event(game)];
        if self.pending_offers.is_empty() {
            events.push(ServerEvent::PhaseChange {
                phase: "round_start".into(),
                phase_data: game.base_phase_data(),
                round_number: game.room.round_number,
                turn_number: game.room.turn_number,
            });
            return (events, Some(Phase::RoundStart(RoundStart::default())));
        }
        game.redeal_offer_seat = self.pending_offers.front().copied();
        (events, None)
    }

    fn allowed_actions(&self, _game: &GameData, _player_name: &str) -> Vec<&'static str> {
        vec!["redeal_decision", "leave_room"]
    }

    fn handle(&mut self, player_name: &str, action: &ClientAction, game: &mut GameData) -> HandleOutcome {
        let ClientAction::RedealDecision { accept } = action else {
            return HandleOutcome::rejected(ActionErrorKind::WrongPhase);
        };
        let Some(&offered_seat) = self.pending_offers.front() else {
            return HandleOutcome::rejected(ActionErrorKind::WrongPhase);
        };
        if game.seat_name(offered_seat) != Some(player_name) {
            return HandleOutcome::rejected(ActionErrorKind::NotYourDecision);
        }

        if *accept {
            let cap = game.config().redeal_multiplier_cap;
            game.room.redeal_multiplier = (game.room.redeal_multiplier + 1).min(cap);
            game.next_round_starter_seat = Some(offered_seat);
            self.deal_and_detect_weak(game);
            game.turn_starter = Some(offered_seat);
            game.redeal_offer_seat = self.pending_offers.front().copied();
        } else {
            self.pending_offers.pop_front();
            game.redeal_offer_seat = self.pending_offers.front().copied();
        }

        let mut events = vec![self.enter_event(game)];
        if self.pending_offers.is_empty() {
            events.push(ServerEvent::PhaseChange {
                phase: "round_start".into(),
                phase_data: game.base_phase_data(),
                round_number: game.room.round_number,
                turn_number: game.room.turn_number,
            });
            return HandleOutcome::transition(events, Phase::RoundStart(RoundStart::default()));
        }
        HandleOutcome::accepted(events)
    }
}
