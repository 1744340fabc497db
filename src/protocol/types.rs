use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Default length of generated room codes.
pub const DEFAULT_ROOM_CODE_LENGTH: usize = 4;
/// Prefix every tenant API key must carry.
pub const API_KEY_PREFIX: &str = "wt_";
/// Upper bound on stored save payloads (25 MiB).
pub const MAX_SAVE_BYTES: usize = 25 * 1024 * 1024;

/// Tenant identifier resolved from an API key. One registered game.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(String);

impl GameId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for GameId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Client-asserted player identifier. Not authenticated; unique within a
/// room's roster. Ordering is lexicographic, which the host-migration
/// tie-break relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Borrow<str> for PlayerId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A 4-character room code. Stored uppercase; all comparisons are
/// case-insensitive because construction canonicalizes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Canonicalize a client-supplied code to uppercase.
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_ascii_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Authenticated request context bound by the auth gate and consumed by
/// every public surface. `player_id` is client-asserted.
#[derive(Debug, Clone)]
pub struct Tenant {
    pub game_id: GameId,
    pub project_id: String,
    pub player_id: PlayerId,
    pub api_key: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_code_canonicalizes_to_uppercase() {
        assert_eq!(RoomCode::new("hqk3").as_str(), "HQK3");
        assert_eq!(RoomCode::new(" HqK3 ").as_str(), "HQK3");
        assert_eq!(RoomCode::new("hqk3"), RoomCode::new("HQK3"));
    }

    #[test]
    fn player_id_orders_lexicographically() {
        assert!(PlayerId::from("alice") < PlayerId::from("bob"));
        assert!(PlayerId::from("bob") < PlayerId::from("carol"));
    }

    #[test]
    fn ids_serialize_transparently() {
        let id = PlayerId::from("alice");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"alice\"");
        let game: GameId = serde_json::from_str("\"g-123\"").unwrap();
        assert_eq!(game.as_str(), "g-123");
    }
}
