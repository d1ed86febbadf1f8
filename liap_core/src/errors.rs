//! Error taxonomy. Kinds, not ad-hoc strings: Validation, Protocol, Rule,
//! Transport, Fatal (spec §7).
//!
//! Validation and Protocol and Rule errors never mutate game state; they
//! are turned into a unicast `error` event by the caller. Transport
//! errors are handled per-recipient by the Broadcaster. Fatal errors
//! terminate the room.

use thiserror::Error;

/// Wire-visible reason code, sent back to the client as `error.code`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionErrorKind {
    InvalidRequest,
    WrongPhase,
    NotYourTurn,
    NotYourDecision,
    NotHost,
    RoomFull,
    NameTaken,
    RoomStarted,
    RoomNotFound,
    NeedFourPlayers,
    TotalCannotEqual8,
    NoThirdConsecutiveZero,
    WrongPieceCount,
    InvalidPieces,
}

impl ActionErrorKind {
    pub fn message(&self) -> &'static str {
        match self {
            Self::InvalidRequest => "malformed or out-of-range request",
            Self::WrongPhase => "action not allowed in the current phase",
            Self::NotYourTurn => "it is not your turn",
            Self::NotYourDecision => "this decision belongs to another seat",
            Self::NotHost => "only the host may do that",
            Self::RoomFull => "room already has four seats filled",
            Self::NameTaken => "that name is already in use in this room",
            Self::RoomStarted => "the game has already started",
            Self::RoomNotFound => "no room with that id exists",
            Self::NeedFourPlayers => "need four players to start",
            Self::TotalCannotEqual8 => "the last declaration cannot bring the total to 8",
            Self::NoThirdConsecutiveZero => "cannot declare zero a third time in a row",
            Self::WrongPieceCount => "play must match the required piece count",
            Self::InvalidPieces => "indices do not refer to distinct pieces in hand",
        }
    }
}

/// A rejected action, carrying the reason the caller should relay as a
/// unicast `error` event. Never mutates game state.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("{}", .kind.message())]
pub struct ActionError {
    pub kind: ActionErrorKind,
}

impl ActionError {
    pub fn new(kind: ActionErrorKind) -> Self {
        Self { kind }
    }
}

impl From<ActionErrorKind> for ActionError {
    fn from(kind: ActionErrorKind) -> Self {
        Self::new(kind)
    }
}

/// Room roster errors (§4.2).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoomError {
    #[error("room full")]
    RoomFull,
    #[error("name already taken: {0}")]
    NameTaken(String),
    #[error("room already started")]
    RoomStarted,
    #[error("player not found: {0}")]
    NotFound(String),
}

impl From<RoomError> for ActionError {
    fn from(e: RoomError) -> Self {
        match e {
            RoomError::RoomFull => ActionErrorKind::RoomFull.into(),
            RoomError::NameTaken(_) => ActionErrorKind::NameTaken.into(),
            RoomError::RoomStarted => ActionErrorKind::RoomStarted.into(),
            RoomError::NotFound(_) => ActionErrorKind::InvalidRequest.into(),
        }
    }
}

/// An internal invariant violation. Surfaces, never masked: the room that
/// raises this is torn down (§7 Fatal).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FatalError {
    #[error("hand size underflow for seat {seat}")]
    HandUnderflow { seat: usize },
    #[error("sequence counter overflow in room {room_id}")]
    SequenceOverflow { room_id: String },
    #[error("invariant violated: {0}")]
    Invariant(String),
}

/// `ServerConfig`/`RoomConfig` validation errors, raised at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required env var {var}: {hint}")]
    MissingRequired { var: String, hint: String },
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: String, reason: String },
}
