//! Seat roster and host tracking (§4.2). `Room` is the stable part of a
//! table: four fixed slots, a host, and the lobby/lifecycle bookkeeping
//! that survives across rounds. Per-round gameplay state lives in
//! [`crate::game::GameData`], which wraps a `Room`.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::RoomError;
use crate::rules::{Hand, HAND_SIZE, MAX_REDEAL_MULTIPLIER};

pub const SEAT_COUNT: usize = 4;

/// One of the four fixed slots in a room. Slots never migrate; `name`
/// is `None` for an unfilled slot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Seat {
    pub name: Option<String>,
    pub is_bot: bool,
    pub original_is_bot: bool,
    pub is_connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnect_time: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub hand: Hand,
    pub declared: Option<u8>,
    pub captured_piles: u32,
    pub score: i32,
    pub zero_declares_in_a_row: u32,
}

impl Seat {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_occupied(&self) -> bool {
        self.name.is_some()
    }

    pub fn reset_for_new_round(&mut self) {
        self.hand.clear();
        self.declared = None;
        self.captured_piles = 0;
    }
}

/// Gameplay constants and timers, overridable per room (e.g. for tests).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RoomConfig {
    pub hand_size: usize,
    pub score_to_win: i32,
    pub max_rounds: u32,
    pub redeal_multiplier_cap: u32,
    #[serde(with = "duration_secs")]
    pub round_start_timer: Duration,
    #[serde(with = "duration_secs")]
    pub turn_results_timeout: Duration,
    #[serde(with = "duration_millis")]
    pub bot_declare_delay_min: Duration,
    #[serde(with = "duration_millis")]
    pub bot_declare_delay_max: Duration,
    #[serde(with = "duration_millis")]
    pub bot_redeal_delay_min: Duration,
    #[serde(with = "duration_millis")]
    pub bot_redeal_delay_max: Duration,
    pub message_queue_cap: usize,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            hand_size: HAND_SIZE,
            score_to_win: 50,
            max_rounds: 20,
            redeal_multiplier_cap: MAX_REDEAL_MULTIPLIER,
            round_start_timer: Duration::from_secs(5),
            turn_results_timeout: Duration::from_secs(3),
            bot_declare_delay_min: Duration::from_millis(500),
            bot_declare_delay_max: Duration::from_millis(1500),
            bot_redeal_delay_min: Duration::from_millis(300),
            bot_redeal_delay_max: Duration::from_millis(800),
            message_queue_cap: 256,
        }
    }
}

impl RoomConfig {
    pub fn validate(&self) -> Result<(), crate::errors::ConfigError> {
        use crate::errors::ConfigError;
        if self.hand_size == 0 || self.hand_size > 20 {
            return Err(ConfigError::Invalid {
                var: "hand_size".into(),
                reason: "must be between 1 and 20".into(),
            });
        }
        if self.score_to_win <= 0 {
            return Err(ConfigError::Invalid {
                var: "score_to_win".into(),
                reason: "must be positive".into(),
            });
        }
        if self.max_rounds == 0 {
            return Err(ConfigError::Invalid {
                var: "max_rounds".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.redeal_multiplier_cap == 0 {
            return Err(ConfigError::Invalid {
                var: "redeal_multiplier_cap".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.bot_declare_delay_min > self.bot_declare_delay_max {
            return Err(ConfigError::Invalid {
                var: "bot_declare_delay".into(),
                reason: "min must not exceed max".into(),
            });
        }
        if self.bot_redeal_delay_min > self.bot_redeal_delay_max {
            return Err(ConfigError::Invalid {
                var: "bot_redeal_delay".into(),
                reason: "min must not exceed max".into(),
            });
        }
        if self.message_queue_cap == 0 {
            return Err(ConfigError::Invalid {
                var: "message_queue_cap".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

mod duration_secs {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(d)?))
    }
}

mod duration_millis {
    use super::Duration;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}

/// A turn's final outcome, appended to `turn_history_this_round` (§3).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnRecord {
    pub turn_number: u32,
    pub starter_seat: usize,
    pub required_piece_count: usize,
    pub winner_seat: usize,
}

/// One seat's contribution to the current turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayEntry {
    pub seat: usize,
    pub pieces: Vec<crate::rules::Piece>,
}

/// The stable part of a table: roster, host, lifecycle metadata (§3 Room).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub host_name: Option<String>,
    pub seats: [Seat; SEAT_COUNT],
    pub started: bool,
    pub created_at: DateTime<Utc>,
    pub round_number: u32,
    pub turn_number: u32,
    pub redeal_multiplier: u32,
    pub turn_history_this_round: Vec<TurnRecord>,
    pub config: RoomConfig,
}

impl Room {
    pub fn new(room_id: impl Into<String>, config: RoomConfig) -> Self {
        Self {
            room_id: room_id.into(),
            host_name: None,
            seats: Default::default(),
            started: false,
            created_at: Utc::now(),
            round_number: 0,
            turn_number: 0,
            redeal_multiplier: 1,
            turn_history_this_round: Vec::new(),
            config,
        }
    }

    pub fn find_seat_index(&self, name: &str) -> Option<usize> {
        self.seats.iter().position(|s| s.name.as_deref() == Some(name))
    }

    pub fn first_empty_slot(&self) -> Option<usize> {
        self.seats.iter().position(|s| !s.is_occupied())
    }

    /// `add_player(name, is_bot)` (§4.2).
    pub fn add_player(&mut self, name: &str, is_bot: bool) -> Result<usize, RoomError> {
        if self.started {
            return Err(RoomError::RoomStarted);
        }
        if self
            .seats
            .iter()
            .any(|s| s.name.as_deref() == Some(name))
        {
            return Err(RoomError::NameTaken(name.to_string()));
        }
        let slot = self.first_empty_slot().ok_or(RoomError::RoomFull)?;
        let is_host = self.host_name.is_none();
        self.seats[slot] = Seat {
            name: Some(name.to_string()),
            is_bot,
            original_is_bot: is_bot,
            is_connected: !is_bot,
            ..Seat::empty()
        };
        if is_host {
            self.host_name = Some(name.to_string());
        }
        Ok(slot)
    }

    /// `remove_player(name)` (§4.2). Returns `(seat_index, was_host)`.
    pub fn remove_player(&mut self, name: &str) -> Result<(usize, bool), RoomError> {
        let idx = self
            .find_seat_index(name)
            .ok_or_else(|| RoomError::NotFound(name.to_string()))?;
        let was_host = self.is_host(name);
        self.seats[idx] = Seat::empty();
        if was_host {
            self.host_name = None;
        }
        Ok((idx, was_host))
    }

    /// `add_bot` targets a specific empty slot (§6.2 `add_bot {slot}`),
    /// unlike `add_player` which picks the first empty one.
    pub fn add_bot_at(&mut self, slot: usize, name: &str) -> Result<(), RoomError> {
        if self.started {
            return Err(RoomError::RoomStarted);
        }
        if slot >= SEAT_COUNT || self.seats[slot].is_occupied() {
            return Err(RoomError::RoomFull);
        }
        if self.seats.iter().any(|s| s.name.as_deref() == Some(name)) {
            return Err(RoomError::NameTaken(name.to_string()));
        }
        let is_host = self.host_name.is_none();
        self.seats[slot] = Seat {
            name: Some(name.to_string()),
            is_bot: true,
            original_is_bot: true,
            is_connected: false,
            ..Seat::empty()
        };
        if is_host {
            self.host_name = Some(name.to_string());
        }
        Ok(())
    }

    pub fn is_host(&self, name: &str) -> bool {
        self.host_name.as_deref() == Some(name)
    }

    pub fn has_any_humans(&self) -> bool {
        self.seats.iter().any(|s| s.is_occupied() && !s.is_bot)
    }

    pub fn has_any_connected_humans(&self) -> bool {
        self.seats
            .iter()
            .any(|s| s.is_occupied() && !s.is_bot && s.is_connected)
    }

    pub fn occupied_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_occupied()).count()
    }

    /// Choose lowest-slot connected human, else lowest-slot human
    /// (disconnected), else lowest-slot bot, else `None` (§4.2).
    pub fn migrate_host(&mut self) -> Option<String> {
        let new_host = self
            .seats
            .iter()
            .find(|s| s.is_occupied() && !s.is_bot && s.is_connected)
            .or_else(|| self.seats.iter().find(|s| s.is_occupied() && !s.is_bot))
            .or_else(|| self.seats.iter().find(|s| s.is_occupied()))
            .and_then(|s| s.name.clone());
        self.host_name = new_host.clone();
        new_host
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room() -> Room {
        Room::new("ABC123", RoomConfig::default())
    }

    #[test]
    fn add_player_fills_slots_in_order_and_sets_first_host() {
        let mut r = room();
        let slot = r.add_player("Alice", false).unwrap();
        assert_eq!(slot, 0);
        assert_eq!(r.host_name.as_deref(), Some("Alice"));
    }

    #[test]
    fn add_player_rejects_duplicate_name() {
        let mut r = room();
        r.add_player("Alice", false).unwrap();
        assert_eq!(
            r.add_player("Alice", false),
            Err(RoomError::NameTaken("Alice".into()))
        );
    }

    #[test]
    fn add_player_rejects_when_full() {
        let mut r = room();
        for name in ["Alice", "Bob", "Cara", "Dan"] {
            r.add_player(name, false).unwrap();
        }
        assert_eq!(r.add_player("Eve", false), Err(RoomError::RoomFull));
    }

    #[test]
    fn add_player_rejects_after_start() {
        let mut r = room();
        r.started = true;
        assert_eq!(
            r.add_player("Alice", false),
            Err(RoomError::RoomStarted)
        );
    }

    #[test]
    fn remove_player_reports_was_host() {
        let mut r = room();
        r.add_player("Alice", false).unwrap();
        r.add_player("Bob", false).unwrap();
        let (idx, was_host) = r.remove_player("Alice").unwrap();
        assert_eq!(idx, 0);
        assert!(was_host);
        assert!(r.host_name.is_none());
    }

    #[test]
    fn remove_player_not_found() {
        let mut r = room();
        assert_eq!(
            r.remove_player("Ghost"),
            Err(RoomError::NotFound("Ghost".into()))
        );
    }

    #[test]
    fn migrate_host_prefers_connected_human_by_lowest_slot() {
        let mut r = room();
        r.add_player("Alice", false).unwrap();
        r.add_player("Bob", false).unwrap();
        r.seats[1].is_connected = true;
        r.seats[0].is_connected = false;
        let new_host = r.migrate_host();
        assert_eq!(new_host.as_deref(), Some("Bob"));
    }

    #[test]
    fn migrate_host_falls_back_to_disconnected_human_then_bot() {
        let mut r = room();
        r.add_player("Alice", true).unwrap();
        assert_eq!(r.migrate_host().as_deref(), Some("Alice"));
    }

    #[test]
    fn migrate_host_no_op_when_current_host_unique_and_human() {
        let mut r = room();
        r.add_player("Alice", false).unwrap();
        r.seats[0].is_connected = true;
        assert_eq!(r.migrate_host().as_deref(), Some("Alice"));
    }

    #[test]
    fn migrate_host_returns_none_when_room_empty() {
        let mut r = room();
        assert_eq!(r.migrate_host(), None);
    }

    #[test]
    fn has_any_humans_false_when_all_bots() {
        let mut r = room();
        r.add_player("Bot1", true).unwrap();
        assert!(!r.has_any_humans());
    }

    #[test]
    fn room_config_validate_catches_inverted_delay_ranges() {
        let mut cfg = RoomConfig::default();
        cfg.bot_declare_delay_min = Duration::from_millis(2000);
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn room_config_default_is_valid() {
        assert!(RoomConfig::default().validate().is_ok());
    }
}
