//! Internal key-administration plane.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegisterKeyRequest {
    #[serde(default)]
    api_key: String,
    #[serde(default)]
    game_id: String,
    #[serde(default)]
    project_id: String,
}

/// `POST /internal/keys`
pub async fn register_key(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let request: RegisterKeyRequest =
        serde_json::from_slice(&body).map_err(|_| ApiError::BadJson)?;
    state
        .keys
        .put(&request.api_key, &request.game_id, &request.project_id)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// `DELETE /internal/keys/{api_key}` — idempotent revocation.
pub async fn revoke_key(
    State(state): State<AppState>,
    Path(api_key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    state.keys.delete(&api_key).await?;
    Ok(Json(json!({ "success": true })))
}

/// `GET /internal/keys/{api_key}`
pub async fn inspect_key(
    State(state): State<AppState>,
    Path(api_key): Path<String>,
) -> Result<Json<Value>, ApiError> {
    match state.keys.get(&api_key).await? {
        Some(record) => Ok(Json(json!({
            "exists": true,
            "gameId": record.game_id,
            "projectId": record.project_id,
            "createdAt": record.created_at,
        }))),
        None => Ok(Json(json!({ "exists": false }))),
    }
}
