//! Room HTTP surface: create, info, and roster join.

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Serialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::protocol::{RoomCode, RoomSummary, Tenant};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub code: RoomCode,
    pub ws_url: String,
}

/// `POST /v1/rooms` — allocate a code and create the room with the caller
/// as host. Code collisions are retried inside the registry; a conflict
/// surfacing here means the retry budget was exhausted.
pub async fn create_room(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
) -> Result<Json<CreateRoomResponse>, ApiError> {
    let (code, _summary) = state
        .rooms
        .create(&tenant.game_id, &tenant.player_id)
        .await?;
    let ws_url = format!("/v1/rooms/{code}/ws");
    Ok(Json(CreateRoomResponse { code, ws_url }))
}

/// `GET /v1/rooms/{code}` — roster-level room info.
pub async fn room_info(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(code): Path<String>,
) -> Result<Json<RoomSummary>, ApiError> {
    let code = RoomCode::new(code);
    let summary = state.rooms.info(&tenant.game_id, &code).await?;
    Ok(Json(summary))
}

/// `POST /v1/rooms/{code}/join` — add the caller to the roster without a
/// socket. Idempotent; peers hear `player_joined` only on first contact.
pub async fn join_room(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(code): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let code = RoomCode::new(code);
    let outcome = state
        .rooms
        .join(&tenant.game_id, &code, &tenant.player_id)
        .await?;
    let summary = outcome.summary;
    Ok(Json(json!({
        "success": true,
        "hostId": summary.host_id,
        "players": summary.players,
        "playerCount": summary.player_count,
    })))
}
