//! Front-door authentication for the public and internal planes.
//!
//! Every public request resolves its API key to a `gameId` through the
//! key registry and binds a client-asserted `playerId`; requests without
//! both are refused before any handler runs. The internal plane instead
//! checks a deployment-time shared secret in constant time.

use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, Uri};
use serde::Deserialize;
use subtle::ConstantTimeEq;

use super::error::AuthError;
use crate::keys::KeyRegistry;
use crate::protocol::{PlayerId, Tenant, API_KEY_PREFIX};

const PLAYER_ID_HEADER: &str = "x-player-id";

/// Query-parameter fallbacks. Browsers cannot attach custom headers to a
/// WebSocket upgrade, so the key and player id may ride in the URL there.
#[derive(Debug, Default, Deserialize)]
struct AuthQueryParams {
    #[serde(rename = "apiKey")]
    api_key: Option<String>,
    #[serde(rename = "playerId")]
    player_id: Option<String>,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

fn query_params(uri: &Uri) -> AuthQueryParams {
    axum::extract::Query::<AuthQueryParams>::try_from_uri(uri)
        .map(|query| query.0)
        .unwrap_or_default()
}

/// Public-plane gate: API key → tenant resolution plus player binding.
#[derive(Clone)]
pub struct AuthGate {
    registry: KeyRegistry,
}

impl AuthGate {
    pub fn new(registry: KeyRegistry) -> Self {
        Self { registry }
    }

    /// Resolve the tenant context for one request. Performs exactly one
    /// registry lookup; there is no cache.
    pub async fn resolve(&self, headers: &HeaderMap, uri: &Uri) -> Result<Tenant, AuthError> {
        let params = query_params(uri);

        let api_key = bearer_token(headers).or(params.api_key);
        let player_id = headers
            .get(PLAYER_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .or(params.player_id);

        let Some(player_id) = player_id.filter(|id| !id.is_empty()) else {
            return Err(AuthError::PlayerIdRequired);
        };
        let Some(api_key) = api_key else {
            return Err(AuthError::AuthRequired);
        };
        if !api_key.starts_with(API_KEY_PREFIX) {
            return Err(AuthError::InvalidKeyFormat);
        }

        let record = self
            .registry
            .get(&api_key)
            .await
            .map_err(|err| {
                tracing::error!(error = %err, "API key lookup failed");
                AuthError::LookupFailed
            })?
            .ok_or(AuthError::InvalidKey)?;

        Ok(Tenant {
            game_id: record.game_id,
            project_id: record.project_id,
            player_id: PlayerId::new(player_id),
            api_key,
        })
    }
}

/// Internal-plane gate for key administration and process metrics.
/// Compares the bearer token against the deployment secret in constant
/// time; when no secret is configured every attempt is rejected.
#[derive(Clone)]
pub struct InternalGate {
    secret: Option<String>,
}

impl InternalGate {
    pub fn new(secret: Option<String>) -> Self {
        if secret.is_none() {
            tracing::warn!(
                "No internal secret configured; all internal-plane requests will be rejected"
            );
        }
        Self { secret }
    }

    pub fn check(&self, headers: &HeaderMap) -> Result<(), AuthError> {
        let Some(expected) = self.secret.as_deref() else {
            return Err(AuthError::InvalidInternalSecret);
        };
        let Some(presented) = bearer_token(headers) else {
            return Err(AuthError::InvalidInternalSecret);
        };
        if presented.len() != expected.len()
            || presented.as_bytes().ct_eq(expected.as_bytes()).unwrap_u8() != 1
        {
            return Err(AuthError::InvalidInternalSecret);
        }
        Ok(())
    }
}
