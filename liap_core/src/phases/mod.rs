//! The `PhaseState` family (§4.6): one type per game phase, dispatched
//! through `enum_dispatch` the way the teacher's `Game<T>` typestate
//! swaps its state type via `std::mem::take` + `.step()`. Here the
//! "swap" is driven by `GameStateMachine` assigning a new `Phase` to a
//! room's current-phase slot.

mod declaration;
mod game_over;
mod preparation;
mod round_start;
mod scoring;
mod turn;
mod turn_results;
mod waiting;

pub use declaration::Declaration;
pub use game_over::GameOver;
pub use preparation::Preparation;
pub use round_start::RoundStart;
pub use scoring::Scoring;
pub use turn::Turn;
pub use turn_results::TurnResults;
pub use waiting::Waiting;

use std::time::Duration;

use enum_dispatch::enum_dispatch;

use crate::errors::ActionError;
use crate::game::GameData;
use crate::net::messages::{ClientAction, ServerEvent};

/// The outcome of `PhaseHandler::handle` (§4.6 operation 3).
pub enum HandleOutcome {
    Accepted {
        events: Vec<ServerEvent>,
        next_phase: Option<Phase>,
    },
    Rejected(ActionError),
}

impl HandleOutcome {
    pub fn accepted(events: Vec<ServerEvent>) -> Self {
        Self::Accepted { events, next_phase: None }
    }

    pub fn transition(events: Vec<ServerEvent>, next_phase: Phase) -> Self {
        Self::Accepted { events, next_phase: Some(next_phase) }
    }

    pub fn rejected(err: impl Into<ActionError>) -> Self {
        Self::Rejected(err.into())
    }
}

/// Four operations every phase implements (§4.6), plus two extras this
/// design needs for timers: `timer` (how long to wait before firing
/// `on_timer`, if at all) and `on_timer` itself (RoundStart's 5 s pause,
/// TurnResults's 3 s animation fallback).
#[enum_dispatch]
pub trait PhaseHandler {
    fn name(&self) -> &'static str;

    /// Deterministic setup: deal cards, mark starter, etc (§4.6 op 1).
    /// May itself name the next phase (e.g. Preparation skipping
    /// straight to RoundStart when no hand is weak) — the driver
    /// chains into it synchronously, per §4.7.
    fn on_enter(&mut self, game: &mut GameData) -> (Vec<ServerEvent>, Option<Phase>);

    fn allowed_actions(&self, game: &GameData, player_name: &str) -> Vec<&'static str>;

    fn handle(&mut self, player_name: &str, action: &ClientAction, game: &mut GameData) -> HandleOutcome;

    /// Cleanup (§4.6 op 4). Most phases have none.
    fn on_exit(&mut self, _game: &mut GameData) {}

    /// How long after `on_enter` the driver should fire `on_timer`, if
    /// this phase schedules an automatic transition.
    fn timer(&self) -> Option<Duration> {
        None
    }

    /// Invoked by the driver when `timer()`'s duration elapses. Only
    /// RoundStart and TurnResults override this.
    fn on_timer(&mut self, _game: &mut GameData) -> HandleOutcome {
        HandleOutcome::accepted(Vec::new())
    }
}

#[enum_dispatch(PhaseHandler)]
pub enum Phase {
    Waiting(Waiting),
    Preparation(Preparation),
    RoundStart(RoundStart),
    Declaration(Declaration),
    Turn(Turn),
    TurnResults(TurnResults),
    Scoring(Scoring),
    GameOver(GameOver),
}

impl Default for Phase {
    fn default() -> Self {
        Phase::Waiting(Waiting)
    }
}
