//! Process-wide room registry and lifecycle (§4.9). The sole global
//! mutable state in the crate (§9): everything else lives behind a
//! room's own driver loop. Mirrors the teacher's `TableManager`
//! spawn/lookup/close shape, minus its database persistence — rooms
//! here are purely in-memory and created on demand.

use std::collections::HashMap;
use std::sync::Arc;

use rand::distr::Alphanumeric;
use rand::Rng;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::info;

use crate::action_queue::{action_queue, ActionQueueHandle};
use crate::bot_actor::BotActor;
use crate::broadcaster::Broadcaster;
use crate::connection::{ConnectionRegistry, TransportId};
use crate::errors::RoomError;
use crate::game::GameData;
use crate::game_state_machine::{room_control_channel, GameStateMachine, RoomControl};
use crate::message_queue::MessageQueue;
use crate::net::messages::RoomSummary;
use crate::room::{Room, RoomConfig};
use crate::rules::{RulesEngine, StandardRules};

/// Everything a transport task needs to talk to a running room.
#[derive(Clone)]
pub struct RoomHandle {
    pub room_id: String,
    pub actions: ActionQueueHandle,
    pub control: tokio::sync::mpsc::UnboundedSender<RoomControl>,
    pub connections: ConnectionRegistry,
    pub broadcaster: Broadcaster,
}

struct RoomEntry {
    handle: RoomHandle,
    host_name: Option<String>,
    cue: tokio::sync::watch::Receiver<crate::game_state_machine::BotCue>,
    driver: JoinHandle<()>,
    bot: JoinHandle<()>,
}

/// Creates, finds, and tears down rooms. One per process.
#[derive(Clone)]
pub struct RoomSupervisor {
    rooms: Arc<RwLock<HashMap<String, RoomEntry>>>,
    config: RoomConfig,
}

impl RoomSupervisor {
    pub fn new(config: RoomConfig) -> Self {
        Self {
            rooms: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Creates a room hosted by `host_name`, spawns its driver and bot
    /// actor tasks, and returns a handle transport code can enqueue
    /// actions through.
    pub async fn create_room(&self, host_name: &str) -> Result<RoomHandle, RoomError> {
        let room_id = self.unique_room_id().await;
        let mut room = Room::new(&room_id, self.config);
        room.add_player(host_name, false)?;

        let rules: Arc<dyn RulesEngine> = Arc::new(StandardRules);
        let game = GameData::new(room, rules);

        let (action_handle, action_rx) = action_queue();
        let (control_tx, control_rx) = room_control_channel();
        let connections = ConnectionRegistry::new();
        let message_queue = MessageQueue::new(self.config.message_queue_cap);
        let broadcaster = Broadcaster::new(connections.clone(), message_queue);

        let handle = RoomHandle {
            room_id: room_id.clone(),
            actions: action_handle.clone(),
            control: control_tx,
            connections,
            broadcaster: broadcaster.clone(),
        };

        let (machine, bot_cue) = GameStateMachine::new(room_id.clone(), game, action_rx, control_rx, broadcaster);
        let driver = tokio::spawn(machine.run());

        let summary_cue = bot_cue.clone();
        let bot_actor = BotActor::new(room_id.clone(), action_handle, self.config, bot_cue);
        let bot = tokio::spawn(bot_actor.run());

        let mut rooms = self.rooms.write().await;
        rooms.insert(
            room_id.clone(),
            RoomEntry { handle: handle.clone(), host_name: Some(host_name.to_string()), cue: summary_cue, driver, bot },
        );
        info!(room_id = %room_id, host = host_name, "room created");
        Ok(handle)
    }

    pub async fn get_room(&self, room_id: &str) -> Option<RoomHandle> {
        let rooms = self.rooms.read().await;
        rooms.get(room_id).map(|entry| entry.handle.clone())
    }

    /// Reads each room's live seat count / started flag off its
    /// `BotCue` watch channel rather than reaching into the driver's
    /// owned `GameData` (§9: no back-pointers into a driver's state).
    pub async fn list_rooms(&self) -> Vec<RoomSummary> {
        let rooms = self.rooms.read().await;
        rooms
            .values()
            .map(|entry| {
                let cue = entry.cue.borrow();
                RoomSummary {
                    room_id: entry.handle.room_id.clone(),
                    host_name: entry.host_name.clone(),
                    seat_count: cue.snapshot.players.len(),
                    started: cue.phase != "waiting",
                }
            })
            .collect()
    }

    /// Aborts a room's tasks and removes it from the registry. The
    /// driver loop normally exits on its own once the last human
    /// disconnects; this is the forced path for admin/debug use.
    pub async fn destroy_room(&self, room_id: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(entry) = rooms.remove(room_id) {
            entry.driver.abort();
            entry.bot.abort();
            info!(room_id, "room destroyed");
        }
    }

    /// Routes a dropped transport to its room's driver loop as a
    /// `RoomControl::Disconnect` (§4.9). No-ops if the transport was
    /// never registered to a room.
    pub async fn on_transport_disconnect(&self, connections: &ConnectionRegistry, transport_id: &TransportId) {
        let Some(registration) = connections.on_disconnect(transport_id).await else {
            return;
        };
        if let Some(room) = self.get_room(&registration.room_id).await {
            let _ = room.control.send(RoomControl::Disconnect { player_name: registration.player_name });
        }
    }

    async fn unique_room_id(&self) -> String {
        let rooms = self.rooms.read().await;
        loop {
            let candidate = generate_room_id();
            if !rooms.contains_key(&candidate) {
                return candidate;
            }
        }
    }
}

fn generate_room_id() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect::<String>()
        .to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn create_room_seats_the_host_and_returns_a_handle() {
        let supervisor = RoomSupervisor::new(RoomConfig::default());
        let handle = supervisor.create_room("Alice").await.unwrap();
        assert!(!handle.room_id.is_empty());
        supervisor.destroy_room(&handle.room_id).await;
    }

    #[tokio::test]
    async fn get_room_finds_a_created_room() {
        let supervisor = RoomSupervisor::new(RoomConfig::default());
        let handle = supervisor.create_room("Alice").await.unwrap();
        let found = supervisor.get_room(&handle.room_id).await;
        assert!(found.is_some());
        supervisor.destroy_room(&handle.room_id).await;
    }

    #[tokio::test]
    async fn destroy_room_removes_it_from_the_registry() {
        let supervisor = RoomSupervisor::new(RoomConfig::default());
        let handle = supervisor.create_room("Alice").await.unwrap();
        supervisor.destroy_room(&handle.room_id).await;
        assert!(supervisor.get_room(&handle.room_id).await.is_none());
    }

    #[tokio::test]
    async fn list_rooms_reflects_created_rooms() {
        let supervisor = RoomSupervisor::new(RoomConfig::default());
        supervisor.create_room("Alice").await.unwrap();
        supervisor.create_room("Bob").await.unwrap();
        let rooms = supervisor.list_rooms().await;
        assert_eq!(rooms.len(), 2);
    }

    #[tokio::test]
    async fn list_rooms_reports_the_host_as_the_first_seat() {
        let supervisor = RoomSupervisor::new(RoomConfig::default());
        let handle = supervisor.create_room("Alice").await.unwrap();
        let rooms = supervisor.list_rooms().await;
        let summary = rooms.iter().find(|r| r.room_id == handle.room_id).unwrap();
        assert_eq!(summary.seat_count, 1);
        assert!(!summary.started);
    }
}
