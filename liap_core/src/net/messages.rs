//! The closed client-action and server-event sets (§6.2, §6.3), plus the
//! envelope shapes they ride in (§6.1).
//!
//! `ClientAction` is adjacently tagged on `"action"`/`"data"`; `ServerEvent`
//! is adjacently tagged on `"event"`/`"data"`, matching the envelope
//! exactly so `serde_json` needs no hand-written (de)serialization.

use serde::{Deserialize, Serialize};

use crate::errors::ActionErrorKind;
use crate::rules::Piece;

/// Client -> server (§6.2). The validator (§6.4) is the only thing
/// standing between a raw frame and this enum; anything that doesn't
/// parse into a variant here never reaches the `ActionQueue`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", content = "data", rename_all = "snake_case")]
pub enum ClientAction {
    // Connection
    ClientReady { player_name: String },
    Ack { sequence: i64 },
    SyncRequest,
    Ping,

    // Lobby
    CreateRoom { player_name: String },
    JoinRoom { room_id: String, player_name: String },
    RequestRoomList,

    // Room
    GetRoomState,
    AddBot { slot: usize },
    RemovePlayer { name: String },
    LeaveRoom,
    StartGame,

    // Game
    RedealDecision { accept: bool },
    Declare { value: u8 },
    Play { indices: Vec<usize> },
    AnimationComplete,
    PlayerReady,
}

impl ClientAction {
    pub fn name(&self) -> &'static str {
        match self {
            Self::ClientReady { .. } => "client_ready",
            Self::Ack { .. } => "ack",
            Self::SyncRequest => "sync_request",
            Self::Ping => "ping",
            Self::CreateRoom { .. } => "create_room",
            Self::JoinRoom { .. } => "join_room",
            Self::RequestRoomList => "request_room_list",
            Self::GetRoomState => "get_room_state",
            Self::AddBot { .. } => "add_bot",
            Self::RemovePlayer { .. } => "remove_player",
            Self::LeaveRoom => "leave_room",
            Self::StartGame => "start_game",
            Self::RedealDecision { .. } => "redeal_decision",
            Self::Declare { .. } => "declare",
            Self::Play { .. } => "play",
            Self::AnimationComplete => "animation_complete",
            Self::PlayerReady => "player_ready",
        }
    }
}

/// A player's state as shown to any client (§3 GameState snapshot,
/// §6.3 contract rule: `players` is always an array, never a map).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerView {
    pub name: String,
    pub is_bot: bool,
    pub is_connected: bool,
    pub score: i32,
    pub hand_size: usize,
    pub captured_piles: u32,
    pub declared: Option<u8>,
    pub zero_declares_in_a_row: u32,
}

/// Phase-specific data carried by `phase_change` (§6.3). Field presence
/// varies by phase; absent fields are simply `null` on the wire.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PhaseData {
    pub players: Vec<PlayerView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub my_hand: Option<Vec<Piece>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redeal_offer_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_plays: Option<Vec<PlayEntryView>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_piece_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_player: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starter: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayEntryView {
    pub player_name: String,
    pub pieces: Vec<Piece>,
}

/// Server -> client (§6.3).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    // Connection
    Connected { player_name: String },
    Pong,
    QueuedMessages { events: Vec<Event> },
    Error { code: ActionErrorKind, message: String },

    // Room
    RoomCreated { room_id: String },
    RoomJoined { room_id: String, seat: usize },
    RoomUpdate { players: Vec<PlayerView> },
    RoomListUpdate { rooms: Vec<RoomSummary> },
    RoomClosed { room_id: String },
    HostChanged { old: Option<String>, new: Option<String> },
    PlayerDisconnected { name: String },
    PlayerReconnected { name: String },

    // Game
    PhaseChange {
        phase: String,
        phase_data: PhaseData,
        round_number: u32,
        turn_number: u32,
    },
    TurnResolved { winner: String, captured_piles: u32 },
    RoundComplete { scores: Vec<PlayerView> },
    ScoreUpdate { scores: Vec<PlayerView> },
    GameEnded { winners: Vec<String>, final_scores: Vec<PlayerView> },
    GameTerminated { reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomSummary {
    pub room_id: String,
    pub host_name: Option<String>,
    pub seat_count: usize,
    pub started: bool,
}

/// A sequence-stamped outbound event (§3 Event), emitted by the
/// Broadcaster and what gets stored in the per-seat `MessageQueue`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub sequence: i64,
    #[serde(flatten)]
    pub kind: ServerEvent,
}

impl ServerEvent {
    /// Critical set per §4.4: loss of these would desynchronize a
    /// reconnected client.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            ServerEvent::PhaseChange { .. }
                | ServerEvent::TurnResolved { .. }
                | ServerEvent::RoundComplete { .. }
                | ServerEvent::ScoreUpdate { .. }
                | ServerEvent::GameEnded { .. }
                | ServerEvent::HostChanged { .. }
        )
    }
}

/// The client -> server envelope (§6.1): `{ "action": ..., "data": {...} }`.
/// `ClientAction`'s own adjacent tagging already matches this shape; this
/// alias documents the wire contract explicitly.
pub type ClientEnvelope = ClientAction;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_action_round_trips_through_json() {
        let action = ClientAction::Declare { value: 3 };
        let json = serde_json::to_string(&action).unwrap();
        assert_eq!(json, r#"{"action":"declare","data":{"value":3}}"#);
        let back: ClientAction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn unit_variant_action_has_no_data_payload_issues() {
        let action = ClientAction::StartGame;
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json["action"], "start_game");
    }

    #[test]
    fn server_event_tags_on_event_field() {
        let event = ServerEvent::Pong;
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "pong");
    }

    #[test]
    fn phase_change_players_serializes_as_array() {
        let event = ServerEvent::PhaseChange {
            phase: "declaration".into(),
            phase_data: PhaseData {
                players: vec![PlayerView {
                    name: "Alice".into(),
                    is_bot: false,
                    is_connected: true,
                    score: 0,
                    hand_size: 8,
                    captured_piles: 0,
                    declared: None,
                    zero_declares_in_a_row: 0,
                }],
                ..Default::default()
            },
            round_number: 1,
            turn_number: 0,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert!(json["data"]["phase_data"]["players"].is_array());
    }

    #[test]
    fn critical_events_match_the_message_queue_set() {
        assert!(ServerEvent::HostChanged { old: None, new: None }.is_critical());
        assert!(!ServerEvent::Pong.is_critical());
    }

    #[test]
    fn event_sequence_is_flattened_alongside_the_tag() {
        let event = Event {
            sequence: 42,
            kind: ServerEvent::Pong,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["sequence"], 42);
        assert_eq!(json["event"], "pong");
    }

    #[test]
    fn client_action_name_matches_wire_tag() {
        assert_eq!(ClientAction::Ping.name(), "ping");
        assert_eq!(ClientAction::Declare { value: 1 }.name(), "declare");
    }
}
