use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::types::{GameId, PlayerId, RoomCode};

/// Per-player roster bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub joined_at: DateTime<Utc>,
}

/// One live collaborative session. This struct is both the actor's
/// in-memory authority and the durable snapshot it persists; fields added
/// later must carry `#[serde(default)]` so older snapshots resurrect with
/// zero values.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub game_id: GameId,
    pub code: RoomCode,
    pub host_id: PlayerId,
    pub created_at: DateTime<Utc>,
    pub roster: HashMap<PlayerId, RosterEntry>,
    #[serde(default)]
    pub player_states: HashMap<PlayerId, Value>,
    #[serde(default)]
    pub game_state: Value,
}

/// Roster-level view of a room, used by `info` responses and the
/// late-joiner `connected` frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub game_id: GameId,
    pub host_id: PlayerId,
    pub created_at: DateTime<Utc>,
    pub player_count: usize,
    pub players: Vec<PlayerId>,
}

impl Room {
    /// Initialize a room with its creator as sole member and host.
    pub fn create(game_id: GameId, code: RoomCode, host_id: PlayerId, now: DateTime<Utc>) -> Self {
        let mut roster = HashMap::new();
        roster.insert(host_id.clone(), RosterEntry { joined_at: now });
        Self {
            game_id,
            code,
            host_id,
            created_at: now,
            roster,
            player_states: HashMap::new(),
            game_state: Value::Null,
        }
    }

    /// Add a player to the roster. Returns true only when the player was
    /// newly added; re-admission of a known player is a no-op.
    pub fn admit(&mut self, player_id: &PlayerId, now: DateTime<Utc>) -> bool {
        if self.roster.contains_key(player_id) {
            return false;
        }
        self.roster
            .insert(player_id.clone(), RosterEntry { joined_at: now });
        true
    }

    /// Drop a player from the roster and their ephemeral state. Returns
    /// true when the player was present.
    pub fn remove(&mut self, player_id: &PlayerId) -> bool {
        self.player_states.remove(player_id);
        self.roster.remove(player_id).is_some()
    }

    pub fn contains(&self, player_id: &PlayerId) -> bool {
        self.roster.contains_key(player_id)
    }

    pub fn is_empty(&self) -> bool {
        self.roster.is_empty()
    }

    pub fn player_count(&self) -> usize {
        self.roster.len()
    }

    /// The remaining player with the smallest `joined_at`, ties broken by
    /// lexicographic player id. Deterministic across replays of the same
    /// event sequence.
    pub fn successor(&self) -> Option<PlayerId> {
        self.roster
            .iter()
            .min_by(|(a_id, a), (b_id, b)| a.joined_at.cmp(&b.joined_at).then(a_id.cmp(b_id)))
            .map(|(id, _)| id.clone())
    }

    /// Roster ordered by join time (id as tie-break) for stable listings.
    pub fn players(&self) -> Vec<PlayerId> {
        let mut entries: Vec<_> = self.roster.iter().collect();
        entries.sort_by(|(a_id, a), (b_id, b)| a.joined_at.cmp(&b.joined_at).then(a_id.cmp(b_id)));
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            game_id: self.game_id.clone(),
            host_id: self.host_id.clone(),
            created_at: self.created_at,
            player_count: self.player_count(),
            players: self.players(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn room_with(players: &[(&str, i64)]) -> Room {
        let (first, first_at) = players[0];
        let mut room = Room::create(
            GameId::from("g1"),
            RoomCode::new("HQK3"),
            PlayerId::from(first),
            at(first_at),
        );
        for (id, t) in &players[1..] {
            room.admit(&PlayerId::from(*id), at(*t));
        }
        room
    }

    #[test]
    fn create_seats_the_creator_as_host() {
        let room = room_with(&[("alice", 1)]);
        assert_eq!(room.host_id.as_str(), "alice");
        assert!(room.contains(&PlayerId::from("alice")));
        assert_eq!(room.player_count(), 1);
    }

    #[test]
    fn admit_is_idempotent() {
        let mut room = room_with(&[("alice", 1)]);
        assert!(room.admit(&PlayerId::from("bob"), at(2)));
        assert!(!room.admit(&PlayerId::from("bob"), at(3)));
        assert_eq!(room.player_count(), 2);
    }

    #[test]
    fn successor_orders_by_join_time() {
        let mut room = room_with(&[("alice", 1), ("bob", 2), ("carol", 3)]);
        room.remove(&PlayerId::from("alice"));
        assert_eq!(room.successor().unwrap().as_str(), "bob");
    }

    #[test]
    fn successor_breaks_join_time_ties_lexicographically() {
        let mut room = room_with(&[("zed", 1), ("carol", 5), ("bob", 5)]);
        room.remove(&PlayerId::from("zed"));
        assert_eq!(room.successor().unwrap().as_str(), "bob");
    }

    #[test]
    fn remove_drops_player_state_with_roster_entry() {
        let mut room = room_with(&[("alice", 1), ("bob", 2)]);
        room.player_states
            .insert(PlayerId::from("bob"), serde_json::json!({"hp": 10}));
        assert!(room.remove(&PlayerId::from("bob")));
        assert!(room.player_states.is_empty());
        assert!(!room.remove(&PlayerId::from("bob")));
    }

    #[test]
    fn snapshot_round_trips() {
        let mut room = room_with(&[("alice", 1), ("bob", 2)]);
        room.player_states
            .insert(PlayerId::from("alice"), serde_json::json!({"x": [1, 2, 3]}));
        room.game_state = serde_json::json!({"phase": "playing"});

        let json = serde_json::to_string(&room).unwrap();
        let restored: Room = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.host_id, room.host_id);
        assert_eq!(restored.roster.len(), room.roster.len());
        assert_eq!(restored.player_states, room.player_states);
        assert_eq!(restored.game_state, room.game_state);
    }

    #[test]
    fn older_snapshots_without_state_fields_resurrect_with_defaults() {
        let json = r#"{
            "gameId": "g1",
            "code": "HQK3",
            "hostId": "alice",
            "createdAt": "2024-01-01T00:00:00Z",
            "roster": {"alice": {"joinedAt": "2024-01-01T00:00:00Z"}}
        }"#;
        let room: Room = serde_json::from_str(json).unwrap();
        assert!(room.player_states.is_empty());
        assert_eq!(room.game_state, Value::Null);
    }

    #[test]
    fn summary_reflects_roster() {
        let room = room_with(&[("alice", 1), ("bob", 2)]);
        let summary = room.summary();
        assert_eq!(summary.player_count, 2);
        assert_eq!(
            summary.players,
            vec![PlayerId::from("alice"), PlayerId::from("bob")]
        );
    }
}
