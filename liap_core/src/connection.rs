//! Maps transport ids to `(room_id, player_name)` (§4.3). Thread-safe via
//! a single lock over a map, the same shape `table::actor`'s subscriber
//! map uses.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransportId(pub String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub room_id: String,
    pub player_name: String,
}

#[derive(Debug, Default)]
struct Inner {
    by_transport: HashMap<TransportId, Registration>,
}

/// `register`/`on_disconnect`/`lookup_transport` (§4.3).
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<Inner>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent per `transport_id`: re-registering overwrites the prior
    /// mapping rather than erroring.
    pub async fn register(&self, transport_id: TransportId, room_id: &str, player_name: &str) {
        let mut inner = self.inner.write().await;
        inner.by_transport.insert(
            transport_id,
            Registration {
                room_id: room_id.to_string(),
                player_name: player_name.to_string(),
            },
        );
    }

    pub async fn on_disconnect(&self, transport_id: &TransportId) -> Option<Registration> {
        let mut inner = self.inner.write().await;
        inner.by_transport.remove(transport_id)
    }

    pub async fn lookup_transport(&self, room_id: &str, player_name: &str) -> Option<TransportId> {
        let inner = self.inner.read().await;
        inner
            .by_transport
            .iter()
            .find(|(_, reg)| reg.room_id == room_id && reg.player_name == player_name)
            .map(|(id, _)| id.clone())
    }

    pub async fn lookup_registration(&self, transport_id: &TransportId) -> Option<Registration> {
        let inner = self.inner.read().await;
        inner.by_transport.get(transport_id).cloned()
    }
}
