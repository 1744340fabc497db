use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::auth::AuthError;
use crate::keys::KeyRegistryError;
use crate::room::RoomError;
use crate::saves::SaveError;

/// Error surface for every HTTP endpoint. Each variant maps to one wire
/// error code; the JSON body is `{"error": <message>, "code": <code>}`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("playerId is required (X-Player-ID header or playerId query parameter)")]
    PlayerIdRequired,
    #[error("API key is required (Authorization: Bearer header or apiKey query parameter)")]
    AuthRequired,
    #[error("API key must start with `wt_`")]
    InvalidKeyFormat,
    #[error("unknown API key")]
    InvalidKey,
    #[error("invalid internal secret")]
    InvalidInternalSecret,
    #[error("API key must be non-empty and start with `wt_`")]
    BadFormat,
    #[error("{0}")]
    MissingField(String),
    #[error("request body is not valid JSON")]
    BadJson,
    #[error("save payload too large")]
    SaveTooLarge,
    #[error("room not found")]
    RoomNotFound,
    #[error("save not found")]
    SaveNotFound,
    #[error("room already exists")]
    RoomAlreadyExists,
    #[error("WebSocket upgrade required")]
    UpgradeRequired,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::PlayerIdRequired
            | Self::BadFormat
            | Self::MissingField(_)
            | Self::BadJson
            | Self::SaveTooLarge => StatusCode::BAD_REQUEST,
            Self::AuthRequired
            | Self::InvalidKeyFormat
            | Self::InvalidKey
            | Self::InvalidInternalSecret => StatusCode::UNAUTHORIZED,
            Self::RoomNotFound | Self::SaveNotFound => StatusCode::NOT_FOUND,
            Self::RoomAlreadyExists => StatusCode::CONFLICT,
            Self::UpgradeRequired => StatusCode::UPGRADE_REQUIRED,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable wire code for programmatic handling.
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlayerIdRequired => "PlayerIdRequired",
            Self::AuthRequired => "AuthRequired",
            Self::InvalidKeyFormat => "InvalidKeyFormat",
            Self::InvalidKey => "InvalidKey",
            Self::InvalidInternalSecret => "InvalidInternalSecret",
            Self::BadFormat => "BadFormat",
            Self::MissingField(_) => "MissingField",
            Self::BadJson => "BadJSON",
            Self::SaveTooLarge => "SaveTooLarge",
            Self::RoomNotFound => "RoomNotFound",
            Self::SaveNotFound => "SaveNotFound",
            Self::RoomAlreadyExists => "RoomAlreadyExists",
            Self::UpgradeRequired => "UpgradeRequired",
            Self::Internal(_) => "Internal",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Self::Internal(err) = &self {
            tracing::error!(error = %err, "Request failed with internal error");
        }
        let body = Json(json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::PlayerIdRequired => Self::PlayerIdRequired,
            AuthError::AuthRequired => Self::AuthRequired,
            AuthError::InvalidKeyFormat => Self::InvalidKeyFormat,
            AuthError::InvalidKey => Self::InvalidKey,
            AuthError::InvalidInternalSecret => Self::InvalidInternalSecret,
            AuthError::LookupFailed => Self::Internal(anyhow::anyhow!("API key lookup failed")),
        }
    }
}

impl From<RoomError> for ApiError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::NotFound => Self::RoomNotFound,
            RoomError::AlreadyExists => Self::RoomAlreadyExists,
            RoomError::Unavailable => Self::Internal(anyhow::anyhow!("room actor unavailable")),
        }
    }
}

impl From<KeyRegistryError> for ApiError {
    fn from(err: KeyRegistryError) -> Self {
        match err {
            KeyRegistryError::BadFormat => Self::BadFormat,
            KeyRegistryError::MissingField => {
                Self::MissingField("gameId and projectId must be non-empty".to_string())
            }
            KeyRegistryError::Storage(err) => Self::Internal(err),
        }
    }
}

impl From<SaveError> for ApiError {
    fn from(err: SaveError) -> Self {
        match err {
            SaveError::TooLarge => Self::SaveTooLarge,
            SaveError::Storage(err) => Self::Internal(err),
        }
    }
}
