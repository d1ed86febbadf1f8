//! WebSocket handler for room gameplay.
//!
//! There is a single endpoint, `/ws`. A connection carries no identity of
//! its own: the first frame a client sends must be a `create_room` or
//! `join_room` action, which this module resolves into a room handle
//! before registering the connection anywhere. Every later frame is
//! parsed into a `ClientAction` and handed to that room's `ActionQueue`;
//! this module never touches game state directly.
//!
//! # Connection flow
//!
//! 1. Client connects to `GET /ws`.
//! 2. Client's first text frame is `create_room` or `join_room`.
//! 3. Server resolves the room, registers the connection with
//!    `ConnectionRegistry`/`Broadcaster`, then acknowledges: `create_room`
//!    gets a direct `room_created` unicast; `join_room` is enqueued like
//!    any other action and answered by the room's own driver loop. The
//!    registration always happens before either ack, so neither path can
//!    race the connection's own sender into existence.
//! 4. Two tasks run for the rest of the connection's life: one drains the
//!    room's outbound `Event` channel onto the socket, the other parses
//!    inbound frames and enqueues them, subject to per-connection rate
//!    limits (§5).
//! 5. On disconnect, the transport is deregistered and the room's driver
//!    is told via `RoomControl::Disconnect`.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::time::Duration;

use axum::extract::connect_info::ConnectInfo;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use liap_core::connection::TransportId;
use liap_core::errors::ActionErrorKind;
use liap_core::net::messages::{ClientAction, Event, ServerEvent};
use liap_core::room_supervisor::RoomHandle;
use tokio::sync::mpsc;
use tracing::Instrument;
use uuid::Uuid;

use super::rate_limiter::RateLimiter;
use super::AppState;
use crate::{logging, metrics};

/// Upgrade an HTTP request to a WebSocket, subject to the per-IP open-
/// connection limit (§5).
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    if !state.ip_limits.check(addr.ip()) {
        logging::log_rate_limited(&addr.ip().to_string(), "connection_open");
        metrics::rate_limit_hits_total("connection_open");
        return axum::http::StatusCode::TOO_MANY_REQUESTS.into_response();
    }

    let transport_id = TransportId(Uuid::new_v4().to_string());
    let span = tracing::info_span!("ws_connection", transport_id = %transport_id.0, remote = %addr);
    ws.on_upgrade(move |socket| handle_socket(socket, state, transport_id).instrument(span))
}

/// What the first frame resolved to: a freshly created room awaiting a
/// direct ack, or an existing room whose join still has to flow through
/// the `ActionQueue` like any other action.
enum Entry {
    Created { room: RoomHandle, player_name: String },
    Joining { room: RoomHandle, player_name: String, action: ClientAction },
}

/// Parses the first frame and resolves it to a room, without sending or
/// enqueueing anything. Callers register the connection first, then act
/// on the returned `Entry`; this keeps identity resolution free of the
/// registration-ordering race that would otherwise drop the ack.
async fn establish_identity(text: &str, state: &AppState) -> Result<Entry, ActionErrorKind> {
    let action: ClientAction = serde_json::from_str(text).map_err(|_| ActionErrorKind::InvalidRequest)?;
    match action {
        ClientAction::CreateRoom { player_name } => {
            if state.rooms.list_rooms().await.len() >= state.max_rooms {
                return Err(ActionErrorKind::RoomFull);
            }
            let room = state
                .rooms
                .create_room(&player_name)
                .await
                .map_err(|e| liap_core::errors::ActionError::from(e).kind)?;
            Ok(Entry::Created { room, player_name })
        }
        ClientAction::JoinRoom { room_id, player_name } => {
            let room = state.rooms.get_room(&room_id).await.ok_or(ActionErrorKind::RoomNotFound)?;
            Ok(Entry::Joining { room, player_name: player_name.clone(), action: ClientAction::JoinRoom { room_id, player_name } })
        }
        _ => Err(ActionErrorKind::InvalidRequest),
    }
}

/// Per-connection sliding-window limiters for general traffic and the
/// two high-frequency game actions (§5).
struct ConnectionLimiters {
    general: RateLimiter,
    declare: RateLimiter,
    play: RateLimiter,
}

impl ConnectionLimiters {
    fn new(config: &crate::config::RateLimitConfig) -> Self {
        let minute = Duration::from_secs(60);
        Self {
            general: RateLimiter::new(config.messages_per_connection, minute),
            declare: RateLimiter::new(config.declares_per_connection, minute),
            play: RateLimiter::new(config.plays_per_connection, minute),
        }
    }

    /// Returns the scope name to report if `action` should be rejected.
    fn check(&mut self, action: &ClientAction) -> Result<(), &'static str> {
        if !self.general.check() {
            return Err("messages");
        }
        match action {
            ClientAction::Declare { .. } if !self.declare.check() => Err("declare"),
            ClientAction::Play { .. } if !self.play.check() => Err("play"),
            _ => Ok(()),
        }
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, transport_id: TransportId) {
    metrics::websocket_connections_total();
    let active = state.active_connections.fetch_add(1, Ordering::Relaxed) + 1;
    metrics::websocket_connections_active(active);
    logging::log_connection_event("upgraded", None, None);

    let (mut sink, mut stream) = socket.split();

    let first_text = loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => break Some(text),
            Some(Ok(Message::Close(_))) | None => break None,
            Some(Ok(_)) => continue,
            Some(Err(_)) => break None,
        }
    };

    let Some(text) = first_text else {
        on_disconnect(&state);
        return;
    };

    let entry = match establish_identity(&text, &state).await {
        Ok(entry) => entry,
        Err(kind) => {
            send_unregistered_error(&mut sink, kind).await;
            on_disconnect(&state);
            return;
        }
    };

    let (room, player_name, pending_action): (RoomHandle, String, Option<ClientAction>) = match entry {
        Entry::Created { room, player_name } => (room, player_name, None),
        Entry::Joining { room, player_name, action } => (room, player_name, Some(action)),
    };

    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    room.connections.register(transport_id.clone(), &room.room_id, &player_name).await;
    room.broadcaster.register_sender(transport_id.clone(), event_tx).await;
    logging::log_connection_event("identity_established", Some(room.room_id.as_str()), Some(player_name.as_str()));

    if let Some(action) = pending_action {
        room.actions.enqueue(player_name.clone(), action);
    } else {
        room.broadcaster
            .unicast_to_player(&room.room_id, &player_name, ServerEvent::RoomCreated { room_id: room.room_id.clone() })
            .await;
    }

    let send_task = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            metrics::websocket_messages_sent();
            let Ok(json) = serde_json::to_string(&event) else { continue };
            if sink.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut limiters = ConnectionLimiters::new(&state.rate_limit);
    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => continue,
        };

        metrics::websocket_messages_received();
        let action: ClientAction = match serde_json::from_str(&text) {
            Ok(action) => action,
            Err(e) => {
                logging::log_rejected_action(&room.room_id, &player_name, "parse", &e.to_string());
                continue;
            }
        };

        if let Err(scope) = limiters.check(&action) {
            logging::log_rate_limited(&player_name, scope);
            metrics::rate_limit_hits_total(scope);
            continue;
        }

        room.actions.enqueue(player_name.clone(), action);
    }

    send_task.abort();
    room.broadcaster.unregister_sender(&transport_id).await;
    state.rooms.on_transport_disconnect(&room.connections, &transport_id).await;
    on_disconnect(&state);
}

async fn send_unregistered_error(sink: &mut (impl SinkExt<Message> + Unpin), kind: ActionErrorKind) {
    let envelope = Event { sequence: -1, kind: ServerEvent::Error { code: kind, message: kind.message().to_string() } };
    if let Ok(json) = serde_json::to_string(&envelope) {
        let _ = sink.send(Message::Text(json.into())).await;
    }
}

fn on_disconnect(state: &AppState) {
    let remaining = state.active_connections.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
    metrics::websocket_connections_active(remaining);
    logging::log_connection_event("closed", None, None);
}

#[cfg(test)]
mod tests {
    use super::*;
    use liap_core::room_supervisor::RoomSupervisor;

    fn state() -> AppState {
        AppState::new(RoomSupervisor::new(liap_core::RoomConfig::default()), crate::config::RateLimitConfig::default(), 2)
    }

    #[tokio::test]
    async fn create_room_resolves_to_a_created_entry() {
        let state = state();
        let entry = establish_identity(r#"{"action":"create_room","data":{"player_name":"Alice"}}"#, &state).await.unwrap();
        assert!(matches!(entry, Entry::Created { .. }));
    }

    #[tokio::test]
    async fn join_room_on_unknown_room_is_rejected() {
        let state = state();
        let err = establish_identity(r#"{"action":"join_room","data":{"room_id":"NOPE00","player_name":"Bob"}}"#, &state)
            .await
            .unwrap_err();
        assert_eq!(err, ActionErrorKind::RoomNotFound);
    }

    #[tokio::test]
    async fn join_room_on_known_room_resolves_to_joining_entry() {
        let state = state();
        let handle = state.rooms.create_room("Alice").await.unwrap();
        let msg = format!(r#"{{"action":"join_room","data":{{"room_id":"{}","player_name":"Bob"}}}}"#, handle.room_id);
        let entry = establish_identity(&msg, &state).await.unwrap();
        assert!(matches!(entry, Entry::Joining { .. }));
    }

    #[tokio::test]
    async fn non_lobby_first_action_is_rejected() {
        let state = state();
        let err = establish_identity(r#"{"action":"ping"}"#, &state).await.unwrap_err();
        assert_eq!(err, ActionErrorKind::InvalidRequest);
    }

    #[tokio::test]
    async fn create_room_is_rejected_once_max_rooms_is_reached() {
        let state = state();
        state.rooms.create_room("Alice").await.unwrap();
        state.rooms.create_room("Bob").await.unwrap();
        let err = establish_identity(r#"{"action":"create_room","data":{"player_name":"Carol"}}"#, &state)
            .await
            .unwrap_err();
        assert_eq!(err, ActionErrorKind::RoomFull);
    }

    #[test]
    fn connection_limiters_reject_after_the_configured_declare_cap() {
        let config = crate::config::RateLimitConfig { declares_per_connection: 1, ..crate::config::RateLimitConfig::default() };
        let mut limiters = ConnectionLimiters::new(&config);
        assert!(limiters.check(&ClientAction::Declare { value: 1 }).is_ok());
        assert_eq!(limiters.check(&ClientAction::Declare { value: 2 }), Err("declare"));
    }

    #[test]
    fn connection_limiters_track_play_separately_from_declare() {
        let config = crate::config::RateLimitConfig { declares_per_connection: 0, plays_per_connection: 1, ..crate::config::RateLimitConfig::default() };
        // declares_per_connection: 0 would make every declare fail; play should be unaffected.
        let mut limiters = ConnectionLimiters::new(&config);
        assert!(limiters.check(&ClientAction::Play { indices: vec![0] }).is_ok());
        assert_eq!(limiters.check(&ClientAction::Play { indices: vec![1] }), Err("play"));
    }
}
