//! Per-(room, player) queue of critical events for disconnected seats
//! (§4.4). Not every event is worth queuing: only the critical set
//! survives a disconnect, everything else is simply dropped for that
//! recipient.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::warn;

use crate::net::messages::{Event, ServerEvent};

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
struct Key {
    room_id: String,
    player_name: String,
}

#[derive(Debug, Default)]
struct Inner {
    queues: HashMap<Key, VecDeque<Event>>,
}

/// `queue`/`drain` (§4.4), soft-capped per seat.
#[derive(Debug, Clone)]
pub struct MessageQueue {
    cap: usize,
    inner: Arc<RwLock<Inner>>,
}

impl MessageQueue {
    pub fn new(cap: usize) -> Self {
        Self {
            cap,
            inner: Arc::new(RwLock::new(Inner::default())),
        }
    }

    /// Returns `false` (and queues nothing) if `event` is not in the
    /// critical set.
    pub async fn queue(&self, room_id: &str, player_name: &str, event: Event) -> bool {
        if !event.kind.is_critical() {
            return false;
        }
        let key = Key {
            room_id: room_id.to_string(),
            player_name: player_name.to_string(),
        };
        let mut inner = self.inner.write().await;
        let queue = inner.queues.entry(key.clone()).or_default();
        queue.push_back(event);
        if queue.len() > self.cap {
            warn!(room_id, player_name, cap = self.cap, "message queue overflow, dropping oldest");
            while queue.len() > self.cap.saturating_sub(1) {
                queue.pop_front();
            }
            queue.push_back(Event {
                sequence: -1,
                kind: ServerEvent::Error {
                    code: crate::errors::ActionErrorKind::InvalidRequest,
                    message: "resync_required".into(),
                },
            });
        }
        true
    }

    /// Drains in FIFO order, clearing the queue.
    pub async fn drain(&self, room_id: &str, player_name: &str) -> Vec<Event> {
        let key = Key {
            room_id: room_id.to_string(),
            player_name: player_name.to_string(),
        };
        let mut inner = self.inner.write().await;
        inner
            .queues
            .remove(&key)
            .map(|q| q.into_iter().collect())
            .unwrap_or_default()
    }

    /// Destroys every queue belonging to a room (§4.4, room teardown).
    pub async fn destroy_room(&self, room_id: &str) {
        let mut inner = self.inner.write().await;
        inner.queues.retain(|k, _| k.room_id != room_id);
    }

    pub async fn len(&self, room_id: &str, player_name: &str) -> usize {
        let key = Key {
            room_id: room_id.to_string(),
            player_name: player_name.to_string(),
        };
        let inner = self.inner.read().await;
        inner.queues.get(&key).map(|q| q.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn critical_event(seq: i64) -> Event {
        Event {
            sequence: seq,
            kind: ServerEvent::HostChanged { old: None, new: Some("Bob".into()) },
        }
    }

    fn non_critical_event(seq: i64) -> Event {
        Event { sequence: seq, kind: ServerEvent::Pong }
    }

    #[tokio::test]
    async fn queue_rejects_non_critical_events() {
        let q = MessageQueue::new(10);
        let accepted = q.queue("R1", "Alice", non_critical_event(1)).await;
        assert!(!accepted);
        assert_eq!(q.len("R1", "Alice").await, 0);
    }

    #[tokio::test]
    async fn queue_accepts_critical_events_in_fifo_order() {
        let q = MessageQueue::new(10);
        q.queue("R1", "Alice", critical_event(1)).await;
        q.queue("R1", "Alice", critical_event(2)).await;
        let drained = q.drain("R1", "Alice").await;
        assert_eq!(drained.iter().map(|e| e.sequence).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test]
    async fn drain_clears_the_queue() {
        let q = MessageQueue::new(10);
        q.queue("R1", "Alice", critical_event(1)).await;
        q.drain("R1", "Alice").await;
        assert_eq!(q.len("R1", "Alice").await, 0);
    }

    #[tokio::test]
    async fn overflow_drops_oldest_and_appends_resync_marker() {
        let q = MessageQueue::new(3);
        for i in 0..5 {
            q.queue("R1", "Alice", critical_event(i)).await;
        }
        let drained = q.drain("R1", "Alice").await;
        assert_eq!(drained.len(), 3);
        assert!(matches!(
            drained.last().unwrap().kind,
            ServerEvent::Error { .. }
        ));
    }

    #[tokio::test]
    async fn destroy_room_removes_all_its_queues() {
        let q = MessageQueue::new(10);
        q.queue("R1", "Alice", critical_event(1)).await;
        q.queue("R1", "Bob", critical_event(1)).await;
        q.destroy_room("R1").await;
        assert_eq!(q.len("R1", "Alice").await, 0);
        assert_eq!(q.len("R1", "Bob").await, 0);
    }
}
