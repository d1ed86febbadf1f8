//! The single-consumer driver loop (§4.7). One task per room, owning
//! the current `Phase` and `GameData`, draining the room's
//! `ActionQueue`. No action is processed during a phase transition —
//! the loop holds the baton the whole way through a chain of
//! synchronous transitions (e.g. Preparation -> RoundStart).

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tracing::info;

use crate::action_queue::{ActionQueueReceiver, QueuedAction};
use crate::broadcaster::Broadcaster;
use crate::errors::ActionErrorKind;
use crate::game::{GameData, GameSnapshot};
use crate::net::messages::{ClientAction, ServerEvent};
use crate::phases::{HandleOutcome, Phase, PhaseHandler};

/// What `BotActor` watches in-process instead of subscribing to the
/// wire (§4.10): the current phase name plus a read-only snapshot.
#[derive(Debug, Clone)]
pub struct BotCue {
    pub phase: String,
    pub snapshot: GameSnapshot,
}

/// Connection-lifecycle events the `RoomSupervisor` hands to a room's
/// driver loop (§4.9). These mutate seat/connection state the same way
/// a player action does, so they go through the single-consumer loop
/// rather than being applied directly by the supervisor.
#[derive(Debug, Clone)]
pub enum RoomControl {
    Disconnect { player_name: String },
}

pub fn room_control_channel() -> (mpsc::UnboundedSender<RoomControl>, mpsc::UnboundedReceiver<RoomControl>) {
    mpsc::unbounded_channel()
}

pub struct GameStateMachine {
    room_id: String,
    phase: Phase,
    game: GameData,
    actions: ActionQueueReceiver,
    control: mpsc::UnboundedReceiver<RoomControl>,
    broadcaster: Broadcaster,
    bot_cue: watch::Sender<BotCue>,
}

impl GameStateMachine {
    /// Returns the driver and the read half of its `BotCue` channel,
    /// for `BotActor` to watch (§4.10).
    pub fn new(
        room_id: impl Into<String>,
        game: GameData,
        actions: ActionQueueReceiver,
        control: mpsc::UnboundedReceiver<RoomControl>,
        broadcaster: Broadcaster,
    ) -> (Self, watch::Receiver<BotCue>) {
        let room_id = room_id.into();
        let phase = Phase::default();
        let initial = BotCue { phase: phase.name().to_string(), snapshot: game.snapshot() };
        let (bot_cue, rx) = watch::channel(initial);
        (
            Self {
                room_id,
                phase,
                game,
                actions,
                control,
                broadcaster,
                bot_cue,
            },
            rx,
        )
    }

    fn publish_cue(&self) {
        let cue = BotCue { phase: self.phase.name().to_string(), snapshot: self.game.snapshot() };
        let _ = self.bot_cue.send(cue);
    }

    /// Runs until the `ActionQueue`'s sender half is dropped (the room
    /// has been destroyed by `RoomSupervisor`), or the room tears
    /// itself down after the last human leaves.
    pub async fn run(mut self) {
        self.chain_enter().await;
        self.publish_cue();
        loop {
            let deadline = self.phase.timer().map(|d| Instant::now() + d);
            let done = tokio::select! {
                maybe_action = self.actions.recv() => {
                    match maybe_action {
                        Some(queued) => { self.process_action(queued).await; false }
                        None => true,
                    }
                }
                maybe_control = self.control.recv() => {
                    match maybe_control {
                        Some(RoomControl::Disconnect { player_name }) => self.handle_disconnect(&player_name).await,
                        None => false,
                    }
                }
                _ = Self::wait_for(deadline) => {
                    self.process_timer().await;
                    false
                }
            };
            if done {
                break;
            }
            self.publish_cue();
        }
        info!(room_id = %self.room_id, "driver loop exiting");
    }

    /// §4.9 disconnect handling. Returns `true` if the room should be
    /// torn down (no humans remain).
    async fn handle_disconnect(&mut self, player_name: &str) -> bool {
        let Some(idx) = self.game.room.find_seat_index(player_name) else {
            return false;
        };
        {
            let seat = &mut self.game.room.seats[idx];
            seat.is_connected = false;
            seat.disconnect_time = Some(chrono::Utc::now());
            seat.is_bot = true;
        }
        if self.game.room.is_host(player_name) {
            let old = Some(player_name.to_string());
            let new = self.game.room.migrate_host();
            self.broadcaster
                .broadcast(&mut self.game, ServerEvent::HostChanged { old, new })
                .await;
        } else {
            self.broadcaster
                .broadcast(&mut self.game, ServerEvent::PlayerDisconnected { name: player_name.to_string() })
                .await;
        }
        if !self.game.room.has_any_humans() {
            self.broadcaster
                .broadcast(
                    &mut self.game,
                    ServerEvent::GameTerminated { reason: "all_players_disconnected".into() },
                )
                .await;
            return true;
        }
        false
    }

    /// §4.9 reconnect handling, triggered by a `client_ready` action
    /// naming a seat that is currently marked disconnected.
    async fn handle_reconnect(&mut self, player_name: &str) {
        let Some(idx) = self.game.room.find_seat_index(player_name) else {
            return;
        };
        if self.game.room.seats[idx].is_connected {
            return;
        }
        {
            let seat = &mut self.game.room.seats[idx];
            seat.is_bot = seat.original_is_bot;
            seat.is_connected = true;
            seat.disconnect_time = None;
        }
        self.broadcaster
            .deliver_queued(&self.room_id, player_name)
            .await;
        self.broadcaster
            .broadcast(&mut self.game, ServerEvent::PlayerReconnected { name: player_name.to_string() })
            .await;
    }

    async fn wait_for(deadline: Option<Instant>) {
        match deadline {
            Some(instant) => sleep_until(instant).await,
            None => std::future::pending().await,
        }
    }

    async fn process_action(&mut self, queued: QueuedAction) {
        match &queued.action {
            ClientAction::Ping => {
                self.broadcaster
                    .unicast_to_player(&self.room_id, &queued.player_name, ServerEvent::Pong)
                    .await;
                return;
            }
            ClientAction::ClientReady { player_name } => {
                self.handle_reconnect(player_name).await;
                return;
            }
            ClientAction::Ack { .. } => return,
            ClientAction::SyncRequest => {
                let event = ServerEvent::PhaseChange {
                    phase: self.phase.name().to_string(),
                    phase_data: self.game.base_phase_data(),
                    round_number: self.game.room.round_number,
                    turn_number: self.game.room.turn_number,
                };
                self.broadcaster
                    .unicast_to_player(&self.room_id, &queued.player_name, event)
                    .await;
                return;
            }
            _ => {}
        }

        let allowed = self.phase.allowed_actions(&self.game, &queued.player_name);
        if !allowed.contains(&queued.action.name()) {
            self.broadcaster
                .unicast_to_player(
                    &self.room_id,
                    &queued.player_name,
                    ServerEvent::Error {
                        code: ActionErrorKind::WrongPhase,
                        message: ActionErrorKind::WrongPhase.message().to_string(),
                    },
                )
                .await;
            return;
        }
        let outcome = self.phase.handle(&queued.player_name, &queued.action, &mut self.game);
        self.apply_outcome(outcome, Some(queued.player_name)).await;
    }

    async fn process_timer(&mut self) {
        let outcome = self.phase.on_timer(&mut self.game);
        self.apply_outcome(outcome, None).await;
    }

    async fn apply_outcome(&mut self, outcome: HandleOutcome, origin: Option<String>) {
        match outcome {
            HandleOutcome::Rejected(err) => {
                if let Some(player) = origin {
                    self.broadcaster
                        .unicast_to_player(
                            &self.room_id,
                            &player,
                            ServerEvent::Error { code: err.kind, message: err.kind.message().to_string() },
                        )
                        .await;
                }
            }
            HandleOutcome::Accepted { events, next_phase } => {
                for event in events {
                    self.broadcaster.broadcast(&mut self.game, event).await;
                }
                if let Some(next) = next_phase {
                    self.phase.on_exit(&mut self.game);
                    self.phase = next;
                    self.chain_enter().await;
                }
            }
        }
    }

    /// Drives `on_enter` and any phases it synchronously chains into
    /// (§4.7), broadcasting each phase's own events in order.
    async fn chain_enter(&mut self) {
        loop {
            let (events, next) = self.phase.on_enter(&mut self.game);
            for event in events {
                self.broadcaster.broadcast(&mut self.game, event).await;
            }
            match next {
                Some(next_phase) => {
                    self.phase.on_exit(&mut self.game);
                    self.phase = next_phase;
                }
                None => break,
            }
        }
    }
}
