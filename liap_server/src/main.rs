//! WebSocket front door for the Liap Tui room engine.
//!
//! Boots `liap_core::RoomSupervisor` and serves it behind `/ws`,
//! `/health`, and `/debug/rooms`. All game logic lives in `liap_core`;
//! this binary only wires configuration, logging, metrics, and the
//! axum router together.

mod api;
mod config;
mod logging;
mod metrics;

use std::net::SocketAddr;

use anyhow::Error;
use liap_core::RoomSupervisor;
use pico_args::Arguments;
use tracing::info;

use config::ServerConfig;

const HELP: &str = "\
Run the Liap Tui room server

USAGE:
  liap_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     WebSocket/HTTP bind address  [default: env SERVER_BIND or 127.0.0.1:6969]
  --max-rooms  N           Maximum concurrent rooms      [default: env MAX_ROOMS or 100]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND                         bind address
  METRICS_BIND                        Prometheus exporter bind address (metrics disabled if unset)
  MAX_ROOMS                           maximum concurrent rooms
  HAND_SIZE, SCORE_TO_WIN, MAX_ROUNDS, REDEAL_MULTIPLIER_CAP,
  ROUND_START_TIMER_SECS, TURN_RESULTS_TIMEOUT_SECS,
  BOT_DECLARE_DELAY_MIN_MS, BOT_DECLARE_DELAY_MAX_MS,
  BOT_REDEAL_DELAY_MIN_MS, BOT_REDEAL_DELAY_MAX_MS, MESSAGE_QUEUE_CAP
                                       gameplay constants, see liap_core::RoomConfig
  RATE_LIMIT_CONNECTIONS_PER_IP, RATE_LIMIT_MESSAGES_PER_CONNECTION,
  RATE_LIMIT_DECLARES_PER_CONNECTION, RATE_LIMIT_PLAYS_PER_CONNECTION
                                       per-connection rate limits
  (See .env file for all configuration options)
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    logging::init();

    let mut pargs = Arguments::from_env();
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind_override: Option<SocketAddr> = pargs.opt_value_from_str("--bind").unwrap_or(None);
    let max_rooms_override: Option<usize> = pargs.opt_value_from_str("--max-rooms").unwrap_or(None);

    let config = ServerConfig::from_env(bind_override, max_rooms_override)
        .map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;
    config.validate().map_err(|e| anyhow::anyhow!("configuration error: {e}"))?;

    ctrlc::set_handler(|| std::process::exit(0))?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!(bind = %metrics_bind, "metrics exporter listening");
    }

    let rooms = RoomSupervisor::new(config.room);
    let state = api::AppState::new(rooms, config.rate_limit, config.max_rooms);
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind to {}: {}", config.bind, e))?;

    info!(bind = %config.bind, "liap_server listening, press Ctrl+C to stop");

    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("server error: {e}"))?;

    info!("shutting down");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.expect("failed to install Ctrl+C signal handler");
}
