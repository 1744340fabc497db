//! Stats reader surface and the client-side event tracker.

use axum::body::Bytes;
use axum::extract::State;
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::protocol::Tenant;
use crate::stats::{PlayerRecord, StatsEvent, StatsView};

/// `GET /v1/stats` — per-game counters; zeros for anything absent.
pub async fn game_stats(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
) -> Result<Json<StatsView>, ApiError> {
    let view = state.stats.view(&tenant.game_id).await?;
    Ok(Json(view))
}

#[derive(Debug, Deserialize)]
struct TrackRequest {
    event: String,
}

/// `POST /v1/stats/track` — client-reported lifecycle event.
pub async fn track_event(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: TrackRequest = serde_json::from_slice(&body).map_err(|_| ApiError::BadJson)?;
    let event = StatsEvent::parse(&request.event).ok_or_else(|| {
        ApiError::MissingField(format!("unknown event name `{}`", request.event))
    })?;

    state
        .stats
        .record(&tenant.game_id, &tenant.player_id, event)
        .await?;
    state.metrics.increment_stats_events();
    Ok(Json(json!({ "success": true })))
}

/// `GET /v1/stats/player` — the caller's own record; zero-filled when the
/// player was never seen.
pub async fn player_stats(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
) -> Result<Json<PlayerRecord>, ApiError> {
    let record = state
        .stats
        .player_view(&tenant.game_id, &tenant.player_id)
        .await?;
    Ok(Json(record))
}
