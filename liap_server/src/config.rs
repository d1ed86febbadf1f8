//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated
//! configuration, following `pp_server::config::ServerConfig`.

use std::net::SocketAddr;
use std::time::Duration;

use liap_core::RoomConfig;

/// Complete server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP/WebSocket bind address.
    pub bind: SocketAddr,
    /// Prometheus exporter bind address, if metrics are enabled.
    pub metrics_bind: Option<SocketAddr>,
    /// Maximum concurrent rooms a process will host.
    pub max_rooms: usize,
    /// Gameplay constants handed to every new room.
    pub room: RoomConfig,
    /// Connection-level rate limiting.
    pub rate_limit: RateLimitConfig,
}

/// Per-IP, per-connection, and per-event-type limiter settings (§5).
/// All windows are a sliding minute; the numbers themselves come
/// straight from §5's enumeration.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitConfig {
    /// Per-IP connection opens: 5/min.
    pub connections_per_ip: usize,
    /// Per-connection inbound messages of any kind: 120/min.
    pub messages_per_connection: usize,
    /// `declare` actions: 10/min.
    pub declares_per_connection: usize,
    /// `play` actions: 30/min.
    pub plays_per_connection: usize,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            connections_per_ip: 5,
            messages_per_connection: 120,
            declares_per_connection: 10,
            plays_per_connection: 30,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `max_rooms_override` - Optional room-count cap override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or fails validation.
    pub fn from_env(bind_override: Option<SocketAddr>, max_rooms_override: Option<usize>) -> Result<Self, ConfigError> {
        let bind = bind_override
            .or_else(|| std::env::var("SERVER_BIND").ok().and_then(|s| s.parse().ok()))
            .unwrap_or_else(|| "127.0.0.1:6969".parse().expect("default bind address is valid"));

        let metrics_bind = std::env::var("METRICS_BIND")
            .ok()
            .map(|s| s.parse().map_err(|_| ConfigError::Invalid { var: "METRICS_BIND".into(), reason: "not a valid socket address".into() }))
            .transpose()?;

        let max_rooms = max_rooms_override.unwrap_or_else(|| parse_env_or("MAX_ROOMS", 100));

        let room = RoomConfig {
            hand_size: parse_env_or("HAND_SIZE", RoomConfig::default().hand_size),
            score_to_win: parse_env_or("SCORE_TO_WIN", RoomConfig::default().score_to_win),
            max_rounds: parse_env_or("MAX_ROUNDS", RoomConfig::default().max_rounds),
            redeal_multiplier_cap: parse_env_or("REDEAL_MULTIPLIER_CAP", RoomConfig::default().redeal_multiplier_cap),
            round_start_timer: Duration::from_secs(parse_env_or("ROUND_START_TIMER_SECS", RoomConfig::default().round_start_timer.as_secs())),
            turn_results_timeout: Duration::from_secs(parse_env_or("TURN_RESULTS_TIMEOUT_SECS", RoomConfig::default().turn_results_timeout.as_secs())),
            bot_declare_delay_min: Duration::from_millis(parse_env_or("BOT_DECLARE_DELAY_MIN_MS", RoomConfig::default().bot_declare_delay_min.as_millis() as u64)),
            bot_declare_delay_max: Duration::from_millis(parse_env_or("BOT_DECLARE_DELAY_MAX_MS", RoomConfig::default().bot_declare_delay_max.as_millis() as u64)),
            bot_redeal_delay_min: Duration::from_millis(parse_env_or("BOT_REDEAL_DELAY_MIN_MS", RoomConfig::default().bot_redeal_delay_min.as_millis() as u64)),
            bot_redeal_delay_max: Duration::from_millis(parse_env_or("BOT_REDEAL_DELAY_MAX_MS", RoomConfig::default().bot_redeal_delay_max.as_millis() as u64)),
            message_queue_cap: parse_env_or("MESSAGE_QUEUE_CAP", RoomConfig::default().message_queue_cap),
        };

        let rate_limit = RateLimitConfig {
            connections_per_ip: parse_env_or("RATE_LIMIT_CONNECTIONS_PER_IP", RateLimitConfig::default().connections_per_ip),
            messages_per_connection: parse_env_or(
                "RATE_LIMIT_MESSAGES_PER_CONNECTION",
                RateLimitConfig::default().messages_per_connection,
            ),
            declares_per_connection: parse_env_or(
                "RATE_LIMIT_DECLARES_PER_CONNECTION",
                RateLimitConfig::default().declares_per_connection,
            ),
            plays_per_connection: parse_env_or(
                "RATE_LIMIT_PLAYS_PER_CONNECTION",
                RateLimitConfig::default().plays_per_connection,
            ),
        };

        Ok(ServerConfig { bind, metrics_bind, max_rooms, room, rate_limit })
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rooms == 0 {
            return Err(ConfigError::Invalid { var: "MAX_ROOMS".into(), reason: "must be at least 1".into() });
        }
        self.room.validate()?;
        if self.rate_limit.connections_per_ip == 0 {
            return Err(ConfigError::Invalid { var: "RATE_LIMIT_CONNECTIONS_PER_IP".into(), reason: "must be at least 1".into() });
        }
        if self.rate_limit.messages_per_connection == 0 {
            return Err(ConfigError::Invalid {
                var: "RATE_LIMIT_MESSAGES_PER_CONNECTION".into(),
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {var}: {hint}")]
    MissingRequired { var: String, hint: String },
    #[error("invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

impl From<liap_core::errors::ConfigError> for ConfigError {
    fn from(e: liap_core::errors::ConfigError) -> Self {
        match e {
            liap_core::errors::ConfigError::MissingRequired { var, hint } => ConfigError::MissingRequired { var, hint },
            liap_core::errors::ConfigError::Invalid { var, reason } => ConfigError::Invalid { var, reason },
        }
    }
}

/// Helper to parse an environment variable with a default fallback.
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}
