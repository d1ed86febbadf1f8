//! HTTP/WebSocket API for the Liap Tui server.
//!
//! This module provides the thin transport surface: a single WebSocket
//! endpoint for gameplay, plus `/health` and `/debug/rooms` for
//! operations. All game logic lives in `liap_core`; this module only
//! parses frames, enforces rate limits, and forwards to a room's
//! `ActionQueue`.
//!
//! # Modules
//!
//! - [`websocket`]: connection upgrade, identity establishment, and the
//!   per-connection read/write tasks
//! - [`rooms`]: read-only `/debug/rooms` listing
//! - [`request_id`]: `x-request-id` correlation middleware
//! - [`rate_limiter`]: sliding-window limiter shared by the per-IP and
//!   per-connection checks
//!
//! # Endpoints
//!
//! ```text
//! GET /health        - health check (public)
//! GET /ws             - WebSocket upgrade (public; identity established
//!                        by the first frame, §6.2)
//! GET /debug/rooms    - read-only room listing (public, no auth per §1)
//! ```

pub mod rate_limiter;
pub mod request_id;
pub mod rooms;
pub mod websocket;

use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use liap_core::RoomSupervisor;
use serde_json::json;
use tower_http::cors::CorsLayer;

use crate::config::RateLimitConfig;

use rate_limiter::RateLimiter;

/// Application state shared across all HTTP handlers and WebSocket
/// connections. Cheap to clone: every field is an `Arc` or already
/// internally shared.
#[derive(Clone)]
pub struct AppState {
    pub rooms: RoomSupervisor,
    pub rate_limit: RateLimitConfig,
    pub max_rooms: usize,
    pub ip_limits: Arc<IpRateLimiters>,
    pub active_connections: Arc<AtomicU64>,
    started_at: Instant,
}

impl AppState {
    pub fn new(rooms: RoomSupervisor, rate_limit: RateLimitConfig, max_rooms: usize) -> Self {
        Self {
            rooms,
            ip_limits: Arc::new(IpRateLimiters::new(rate_limit.connections_per_ip)),
            rate_limit,
            max_rooms,
            active_connections: Arc::new(AtomicU64::new(0)),
            started_at: Instant::now(),
        }
    }
}

/// Per-IP sliding-window limiter for connection opens (§5). Lazily
/// creates a limiter the first time an IP is seen.
pub struct IpRateLimiters {
    inner: Mutex<HashMap<IpAddr, RateLimiter>>,
    max_per_minute: usize,
}

impl IpRateLimiters {
    pub fn new(max_per_minute: usize) -> Self {
        Self { inner: Mutex::new(HashMap::new()), max_per_minute }
    }

    pub fn check(&self, ip: IpAddr) -> bool {
        let mut inner = self.inner.lock().expect("ip rate limiter mutex poisoned");
        let limiter = inner
            .entry(ip)
            .or_insert_with(|| RateLimiter::new(self.max_per_minute, Duration::from_secs(60)));
        limiter.check()
    }
}

/// Build the complete router: `/health`, `/ws`, `/debug/rooms`, layered
/// with request-id correlation and permissive CORS.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .route("/debug/rooms", get(rooms::list_rooms))
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// No persistence layer to probe (§6.5: no persistent storage
/// interface); this simply confirms the process is alive and reports
/// uptime.
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_secs": state.started_at.elapsed().as_secs(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ip_rate_limiter_blocks_after_the_configured_max() {
        let limiters = IpRateLimiters::new(2);
        let ip: IpAddr = "127.0.0.1".parse().unwrap();
        assert!(limiters.check(ip));
        assert!(limiters.check(ip));
        assert!(!limiters.check(ip));
    }

    #[test]
    fn ip_rate_limiter_tracks_ips_independently() {
        let limiters = IpRateLimiters::new(1);
        let a: IpAddr = "127.0.0.1".parse().unwrap();
        let b: IpAddr = "127.0.0.2".parse().unwrap();
        assert!(limiters.check(a));
        assert!(limiters.check(b));
        assert!(!limiters.check(a));
    }
}
