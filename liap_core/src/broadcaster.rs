//! Sequence-numbered fan-out to a room's connected clients, with
//! queue-on-disconnect hand-off to `MessageQueue` (§4.8).

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::warn;

use crate::connection::{ConnectionRegistry, TransportId};
use crate::game::GameData;
use crate::message_queue::MessageQueue;
use crate::net::messages::{Event, ServerEvent};

#[derive(Debug, Default)]
struct Inner {
    senders: HashMap<TransportId, mpsc::UnboundedSender<Event>>,
}

/// `broadcast`/`unicast` (§4.8). Holds a `ConnectionRegistry` to resolve
/// a seat's current transport and a `MessageQueue` to hand events off to
/// when a recipient is unreachable.
#[derive(Clone)]
pub struct Broadcaster {
    connections: ConnectionRegistry,
    message_queue: MessageQueue,
    inner: Arc<RwLock<Inner>>,
}

impl Broadcaster {
    pub fn new(connections: ConnectionRegistry, message_queue: MessageQueue) -> Self {
        Self {
            connections,
            message_queue,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    pub async fn register_sender(&self, transport_id: TransportId, sender: mpsc::UnboundedSender<Event>) {
        let mut inner = self.inner.write().await;
        inner.senders.insert(transport_id, sender);
    }

    pub async fn unregister_sender(&self, transport_id: &TransportId) {
        let mut inner = self.inner.write().await;
        inner.senders.remove(transport_id);
    }

    /// Fans `event` out to every human seat in the room, queuing for any
    /// seat that's disconnected or whose send fails (§4.8, §7 Transport).
    /// Bots never receive wire deliveries; they observe state in-process.
    pub async fn broadcast(&self, game: &mut GameData, event: ServerEvent) {
        let sequence = game.next_sequence();
        let envelope = Event { sequence, kind: event };
        let room_id = game.room.room_id.clone();

        for seat in game.room.seats.iter() {
            let Some(name) = seat.name.as_deref() else { continue };
            if seat.is_bot {
                continue;
            }
            if seat.is_connected {
                self.deliver_or_queue(&room_id, name, envelope.clone()).await;
            } else {
                self.message_queue.queue(&room_id, name, envelope.clone()).await;
            }
        }
    }

    async fn deliver_or_queue(&self, room_id: &str, player_name: &str, event: Event) {
        let transport = self.connections.lookup_transport(room_id, player_name).await;
        let sent = match transport {
            Some(transport_id) => {
                let inner = self.inner.read().await;
                match inner.senders.get(&transport_id) {
                    Some(sender) => sender.send(event.clone()).is_ok(),
                    None => false,
                }
            }
            None => false,
        };
        if !sent {
            warn!(room_id, player_name, "send failed, falling back to message queue");
            self.message_queue.queue(room_id, player_name, event).await;
        }
    }

    /// Direct response to one action; no sequence bump (§4.8).
    pub async fn unicast_to_player(&self, room_id: &str, player_name: &str, event: ServerEvent) {
        let envelope = Event { sequence: -1, kind: event };
        if let Some(transport_id) = self.connections.lookup_transport(room_id, player_name).await {
            let inner = self.inner.read().await;
            if let Some(sender) = inner.senders.get(&transport_id) {
                let _ = sender.send(envelope);
            }
        }
    }

    /// Delivers a drained queue atomically before any new broadcast is
    /// sent to this recipient (§4.8, §4.9 reconnect).
    pub async fn deliver_queued(&self, room_id: &str, player_name: &str) -> Vec<Event> {
        let queued = self.message_queue.drain(room_id, player_name).await;
        if queued.is_empty() {
            return queued;
        }
        if let Some(transport_id) = self.connections.lookup_transport(room_id, player_name).await {
            let inner = self.inner.read().await;
            if let Some(sender) = inner.senders.get(&transport_id) {
                for event in &queued {
                    let _ = sender.send(event.clone());
                }
            }
        }
        queued
    }
}
