//! Structured logging configuration.
//!
//! Configures a `tracing` subscriber with request correlation and
//! connection-lifecycle event helpers.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize structured logging.
///
/// Log level is configurable via the `RUST_LOG` env var, defaulting to
/// `info` with `hyper`/`tower_http` quieted to `warn`.
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,hyper=warn,tower_http=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry().with(env_filter).with(fmt_layer).init();

    tracing::info!("structured logging initialized");
}

/// Log a connection lifecycle event (upgrade, identity established, close).
#[allow(dead_code)]
pub fn log_connection_event(event: &str, room_id: Option<&str>, player_name: Option<&str>) {
    tracing::info!(
        event = event,
        room_id = room_id,
        player_name = player_name,
        "connection event"
    );
}

/// Log a rejected action, surfaced back to the client as an `error` event.
#[allow(dead_code)]
pub fn log_rejected_action(room_id: &str, player_name: &str, action: &str, reason: &str) {
    tracing::debug!(
        room_id = room_id,
        player_name = player_name,
        action = action,
        reason = reason,
        "action rejected"
    );
}

/// Log a rate limit being hit.
#[allow(dead_code)]
pub fn log_rate_limited(remote: &str, scope: &str) {
    tracing::warn!(remote = remote, scope = scope, "rate limit exceeded");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_connection_event_does_not_panic() {
        log_connection_event("upgraded", None, None);
        log_connection_event("identity_established", Some("ABC123"), Some("Alice"));
    }

    #[test]
    fn log_rejected_action_does_not_panic() {
        log_rejected_action("ABC123", "Alice", "play", "not_your_turn");
    }

    #[test]
    fn log_rate_limited_does_not_panic() {
        log_rate_limited("127.0.0.1", "burst");
    }
}
