//! Per-room FIFO of inbound actions (§4.5). The sole ordering authority
//! in a room: whatever order actions land in this queue is the order
//! the driver loop processes them in, regardless of which transport
//! task or the `BotActor` produced them.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use crate::net::messages::ClientAction;

#[derive(Debug, Clone)]
pub struct QueuedAction {
    pub sequence: i64,
    pub player_name: String,
    pub action: ClientAction,
    pub received_at: DateTime<Utc>,
}

/// The producer half: transport handlers and the `BotActor` both hold
/// clones of this.
#[derive(Clone)]
pub struct ActionQueueHandle {
    sender: mpsc::UnboundedSender<QueuedAction>,
    seq: Arc<AtomicI64>,
}

impl ActionQueueHandle {
    /// `enqueue(action) -> sequence_number`.
    pub fn enqueue(&self, player_name: impl Into<String>, action: ClientAction) -> i64 {
        let sequence = self.seq.fetch_add(1, Ordering::SeqCst) + 1;
        let queued = QueuedAction {
            sequence,
            player_name: player_name.into(),
            action,
            received_at: Utc::now(),
        };
        // The driver loop outlives every producer; a closed receiver
        // means the room is already torn down, which producers racing
        // a disconnect/cleanup should simply ignore.
        let _ = self.sender.send(queued);
        sequence
    }
}

/// The single-consumer half, held only by the `GameStateMachine` driver
/// loop for this room.
pub struct ActionQueueReceiver {
    receiver: mpsc::UnboundedReceiver<QueuedAction>,
}

impl ActionQueueReceiver {
    pub async fn recv(&mut self) -> Option<QueuedAction> {
        self.receiver.recv().await
    }
}

pub fn action_queue() -> (ActionQueueHandle, ActionQueueReceiver) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (
        ActionQueueHandle {
            sender,
            seq: Arc::new(AtomicI64::new(0)),
        },
        ActionQueueReceiver { receiver },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn enqueue_assigns_monotonic_sequence_numbers() {
        let (handle, mut rx) = action_queue();
        let s1 = handle.enqueue("Alice", ClientAction::Ping);
        let s2 = handle.enqueue("Bob", ClientAction::Ping);
        assert_eq!((s1, s2), (1, 2));
        assert_eq!(rx.recv().await.unwrap().sequence, 1);
        assert_eq!(rx.recv().await.unwrap().sequence, 2);
    }

    #[tokio::test]
    async fn ordering_is_enqueue_order_regardless_of_producer() {
        let (handle, mut rx) = action_queue();
        let bot_handle = handle.clone();
        handle.enqueue("Alice", ClientAction::Declare { value: 1 });
        bot_handle.enqueue("BotSeat", ClientAction::Declare { value: 2 });
        handle.enqueue("Alice", ClientAction::Play { indices: vec![0] });

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        let third = rx.recv().await.unwrap();
        assert_eq!(first.player_name, "Alice");
        assert_eq!(second.player_name, "BotSeat");
        assert_eq!(third.player_name, "Alice");
    }
}
