//! Wire message contracts (§6). The transport layer (axum, WebSockets)
//! is out of scope here — this module only specifies the closed set of
//! client actions and server events and their JSON shape.

/// Client action / server event enums and the envelope types.
pub mod messages;

pub use messages::{ClientAction, ClientEnvelope, Event, PlayerView, ServerEvent};
