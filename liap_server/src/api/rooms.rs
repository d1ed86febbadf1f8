//! Read-only room listing for operators.
//!
//! No auth (§1): this surfaces only `RoomSummary`, which already omits
//! hands and declarations, following `pp_server::api::tables::list_tables`'s
//! read-only summary shape.

use axum::extract::State;
use axum::response::{IntoResponse, Json};
use serde_json::json;

use super::AppState;

/// `GET /debug/rooms` - every live room's id, host, seat count, and
/// whether it has started.
pub async fn list_rooms(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = state.rooms.list_rooms().await;
    Json(json!({ "rooms": rooms }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use liap_core::room_supervisor::RoomSupervisor;

    #[tokio::test]
    async fn list_rooms_reports_created_rooms() {
        let rooms = RoomSupervisor::new(liap_core::RoomConfig::default());
        rooms.create_room("Alice").await.unwrap();
        let state = AppState::new(rooms, crate::config::RateLimitConfig::default(), 10);

        let response = list_rooms(State(state)).await.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::OK);
    }
}
