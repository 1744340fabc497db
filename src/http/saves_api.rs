//! Per-player save storage surface.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::protocol::Tenant;

/// `POST /v1/saves/{key}` — store the JSON body verbatim, overwriting any
/// previous value.
pub async fn put_save(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(key): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let value: Value = serde_json::from_slice(&body).map_err(|_| ApiError::BadJson)?;
    state
        .saves
        .put(&tenant.game_id, &tenant.player_id, &key, value)
        .await?;
    Ok(Json(json!({ "success": true, "key": key })))
}

/// `GET /v1/saves/{key}`
pub async fn get_save(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let data = state
        .saves
        .get(&tenant.game_id, &tenant.player_id, &key)
        .await?
        .ok_or(ApiError::SaveNotFound)?;
    Ok(Json(json!({ "key": key, "data": data })))
}

/// `GET /v1/saves` — list this player's save keys.
pub async fn list_saves(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
) -> Result<Json<Value>, ApiError> {
    let keys = state
        .saves
        .list(&tenant.game_id, &tenant.player_id)
        .await?;
    Ok(Json(json!({ "keys": keys })))
}

/// `DELETE /v1/saves/{key}` — idempotent.
pub async fn delete_save(
    State(state): State<AppState>,
    Extension(tenant): Extension<Tenant>,
    Path(key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state
        .saves
        .delete(&tenant.game_id, &tenant.player_id, &key)
        .await?;
    Ok(Json(json!({ "success": true })))
}
