//! # liap_core
//!
//! Authoritative room/game engine for Liap Tui, a four-player turn-based
//! hand-card game. This crate owns everything that decides what is true
//! about a running game: the Rules, the Room roster, connection and
//! message-queue bookkeeping, the per-room action queue, the phase state
//! machine, the broadcaster, the room supervisor, and the bot actor.
//!
//! No transport code lives here — no axum, no sockets. Callers (the
//! `liap_server` binary, or any other front door) talk to a room purely
//! through `RoomHandle`s and channels.
//!
//! ## Data flow
//!
//! external message -> ConnectionRegistry resolves (room, seat) ->
//! ActionQueue(room).enqueue -> GameStateMachine dequeues -> current
//! PhaseState validates -> mutates game -> may emit `phase_change` ->
//! Broadcaster fans out, queuing for disconnected seats -> BotActor may
//! wake for bot seats and enqueue its own action.

pub mod action_queue;
pub mod bot_actor;
pub mod broadcaster;
pub mod connection;
pub mod errors;
pub mod game;
pub mod game_state_machine;
pub mod message_queue;
pub mod net;
pub mod phases;
pub mod room;
pub mod room_supervisor;
pub mod rules;

pub use errors::{ActionError, ActionErrorKind};
pub use game::{GameData, GameSnapshot};
pub use game_state_machine::GameStateMachine;
pub use room::{Room, RoomConfig, Seat};
pub use room_supervisor::{RoomHandle, RoomSupervisor};
pub use rules::{Piece, PlayType, RulesEngine, StandardRules};
