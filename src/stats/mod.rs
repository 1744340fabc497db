//! Per-game usage statistics.
//!
//! Receives lifecycle events from the transport adapter and the room
//! actors, and maintains rolling counters plus daily/monthly unique-player
//! sets in the shared KV namespace under `stats:`. Updates for one game
//! are funneled through a per-game async lock so concurrent events cannot
//! lose a read-modify-write; the contract is the final state, not the
//! interleaving.

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::protocol::{GameId, PlayerId};
use crate::storage::{keys, KvStore};

/// Daily unique sets survive the day plus one day of grace.
const DAILY_SET_TTL_DAYS: i64 = 2;
/// Monthly unique sets survive the month plus five days of grace.
const MONTHLY_SET_TTL_DAYS: i64 = 35;

/// Lifecycle events feeding the accumulator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsEvent {
    SessionStart,
    SessionEnd {
        /// Seconds the session was connected, when the transport knows.
        playtime_secs: Option<u64>,
    },
    RoomCreate,
    RoomClose,
    RoomJoin,
    RoomLeave,
}

impl StatsEvent {
    /// Parse a wire event name from `POST /v1/stats/track`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "session_start" => Some(Self::SessionStart),
            "session_end" => Some(Self::SessionEnd {
                playtime_secs: None,
            }),
            "room_create" => Some(Self::RoomCreate),
            "room_close" => Some(Self::RoomClose),
            "room_join" => Some(Self::RoomJoin),
            "room_leave" => Some(Self::RoomLeave),
            _ => None,
        }
    }
}

/// Rolling counter record stored at `stats:<gameId>`. All counters clamp
/// at zero on decrement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameCounters {
    #[serde(default)]
    pub online: u64,
    #[serde(default)]
    pub in_rooms: u64,
    #[serde(default)]
    pub rooms: u64,
    /// Lifetime unique players.
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Per-player record stored at `stats:<gameId>:player:<playerId>`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    #[serde(default)]
    pub first_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_seen: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sessions: u64,
    /// Accumulated connected seconds, when the transport reports them.
    #[serde(default)]
    pub playtime: u64,
}

/// Reader-surface view: counters plus the current unique-set sizes.
/// Absent fields read as zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub online: u64,
    pub in_rooms: u64,
    pub rooms: u64,
    pub total: u64,
    pub today: u64,
    pub month: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Event sink and reader for per-game statistics.
pub struct StatsAccumulator {
    store: Arc<dyn KvStore>,
    /// Single-writer serialization per game.
    game_locks: DashMap<GameId, Arc<Mutex<()>>>,
}

impl StatsAccumulator {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            game_locks: DashMap::new(),
        }
    }

    fn lock_for(&self, game_id: &GameId) -> Arc<Mutex<()>> {
        self.game_locks
            .entry(game_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Apply one event. Failures are surfaced to the caller for logging;
    /// the accumulator itself never panics on malformed stored values.
    pub async fn record(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        event: StatsEvent,
    ) -> Result<()> {
        let lock = self.lock_for(game_id);
        let _serialized = lock.lock().await;

        let now = Utc::now();
        let mut counters = self.load_counters(game_id).await?;

        match event {
            StatsEvent::SessionStart => {
                counters.online += 1;
                self.touch_unique_set(
                    &keys::stats_daily(game_id, &now.format("%Y-%m-%d").to_string()),
                    player_id,
                    Duration::days(DAILY_SET_TTL_DAYS),
                )
                .await?;
                self.touch_unique_set(
                    &keys::stats_monthly(game_id, &now.format("%Y-%m").to_string()),
                    player_id,
                    Duration::days(MONTHLY_SET_TTL_DAYS),
                )
                .await?;
                if self.upsert_player(game_id, player_id, now).await? {
                    counters.total += 1;
                }
            }
            StatsEvent::SessionEnd { playtime_secs } => {
                counters.online = counters.online.saturating_sub(1);
                if let Some(secs) = playtime_secs {
                    self.add_playtime(game_id, player_id, secs).await?;
                }
            }
            StatsEvent::RoomCreate => counters.rooms += 1,
            StatsEvent::RoomClose => counters.rooms = counters.rooms.saturating_sub(1),
            StatsEvent::RoomJoin => counters.in_rooms += 1,
            StatsEvent::RoomLeave => counters.in_rooms = counters.in_rooms.saturating_sub(1),
        }

        counters.updated_at = Some(now);
        self.store
            .put(
                &keys::stats_counters(game_id),
                serde_json::to_value(&counters)?,
            )
            .await
    }

    /// Counters plus unique-set sizes for the current day and month.
    pub async fn view(&self, game_id: &GameId) -> Result<StatsView> {
        let now = Utc::now();
        let counters = self.load_counters(game_id).await?;
        let today = self
            .unique_set_len(&keys::stats_daily(
                game_id,
                &now.format("%Y-%m-%d").to_string(),
            ))
            .await?;
        let month = self
            .unique_set_len(&keys::stats_monthly(
                game_id,
                &now.format("%Y-%m").to_string(),
            ))
            .await?;

        Ok(StatsView {
            online: counters.online,
            in_rooms: counters.in_rooms,
            rooms: counters.rooms,
            total: counters.total,
            today,
            month,
            updated_at: counters.updated_at,
        })
    }

    /// Per-player record, zero-filled when the player was never seen.
    pub async fn player_view(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
    ) -> Result<PlayerRecord> {
        let value = self.store.get(&keys::stats_player(game_id, player_id)).await?;
        Ok(value
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default())
    }

    async fn load_counters(&self, game_id: &GameId) -> Result<GameCounters> {
        let value = self.store.get(&keys::stats_counters(game_id)).await?;
        Ok(value
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default())
    }

    /// Add `player_id` to a unique set, refreshing its TTL.
    async fn touch_unique_set(
        &self,
        key: &str,
        player_id: &PlayerId,
        ttl: Duration,
    ) -> Result<()> {
        let mut members: Vec<String> = self
            .store
            .get(key)
            .await?
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        if !members.iter().any(|m| m == player_id.as_str()) {
            members.push(player_id.as_str().to_string());
        }
        self.store
            .put_with_ttl(key, serde_json::to_value(&members)?, ttl)
            .await
    }

    async fn unique_set_len(&self, key: &str) -> Result<u64> {
        let members: Vec<String> = self
            .store
            .get(key)
            .await?
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        Ok(members.len() as u64)
    }

    /// Upsert the per-player record; returns true when the player was new
    /// to this game (first session ever).
    async fn upsert_player(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let key = keys::stats_player(game_id, player_id);
        let existing: Option<PlayerRecord> = self
            .store
            .get(&key)
            .await?
            .and_then(|v| serde_json::from_value(v).ok());

        let is_new = existing.is_none();
        let mut record = existing.unwrap_or_default();
        if record.first_seen.is_none() {
            record.first_seen = Some(now);
        }
        record.last_seen = Some(now);
        record.sessions += 1;

        self.store.put(&key, serde_json::to_value(&record)?).await?;
        Ok(is_new)
    }

    async fn add_playtime(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        secs: u64,
    ) -> Result<()> {
        let key = keys::stats_player(game_id, player_id);
        let mut record: PlayerRecord = self
            .store
            .get(&key)
            .await?
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();
        record.playtime = record.playtime.saturating_add(secs);
        self.store.put(&key, serde_json::to_value(&record)?).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryKvStore;

    fn accumulator() -> StatsAccumulator {
        StatsAccumulator::new(Arc::new(InMemoryKvStore::new()))
    }

    fn game() -> GameId {
        GameId::from("g1")
    }

    fn player(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    #[tokio::test]
    async fn absent_game_reads_as_zeros() {
        let stats = accumulator();
        let view = stats.view(&game()).await.unwrap();
        assert_eq!(view.online, 0);
        assert_eq!(view.rooms, 0);
        assert_eq!(view.total, 0);
        assert_eq!(view.today, 0);
        assert_eq!(view.month, 0);
    }

    #[tokio::test]
    async fn session_start_counts_online_and_uniques() {
        let stats = accumulator();
        stats
            .record(&game(), &player("alice"), StatsEvent::SessionStart)
            .await
            .unwrap();
        stats
            .record(&game(), &player("bob"), StatsEvent::SessionStart)
            .await
            .unwrap();
        // Second session for alice must not re-count her as unique.
        stats
            .record(&game(), &player("alice"), StatsEvent::SessionStart)
            .await
            .unwrap();

        let view = stats.view(&game()).await.unwrap();
        assert_eq!(view.online, 3);
        assert_eq!(view.today, 2);
        assert_eq!(view.month, 2);
        assert_eq!(view.total, 2);
    }

    #[tokio::test]
    async fn online_never_drops_below_zero() {
        let stats = accumulator();
        stats
            .record(
                &game(),
                &player("alice"),
                StatsEvent::SessionEnd {
                    playtime_secs: None,
                },
            )
            .await
            .unwrap();
        let view = stats.view(&game()).await.unwrap();
        assert_eq!(view.online, 0);
    }

    #[tokio::test]
    async fn paired_sessions_return_online_to_zero() {
        let stats = accumulator();
        for id in ["a", "b", "c"] {
            stats
                .record(&game(), &player(id), StatsEvent::SessionStart)
                .await
                .unwrap();
        }
        for id in ["a", "b", "c"] {
            stats
                .record(
                    &game(),
                    &player(id),
                    StatsEvent::SessionEnd {
                        playtime_secs: None,
                    },
                )
                .await
                .unwrap();
        }
        let view = stats.view(&game()).await.unwrap();
        assert_eq!(view.online, 0);
        assert_eq!(view.total, 3);
    }

    #[tokio::test]
    async fn room_counters_track_create_close_join_leave() {
        let stats = accumulator();
        stats
            .record(&game(), &player("alice"), StatsEvent::RoomCreate)
            .await
            .unwrap();
        stats
            .record(&game(), &player("alice"), StatsEvent::RoomJoin)
            .await
            .unwrap();
        stats
            .record(&game(), &player("bob"), StatsEvent::RoomJoin)
            .await
            .unwrap();
        stats
            .record(&game(), &player("bob"), StatsEvent::RoomLeave)
            .await
            .unwrap();

        let view = stats.view(&game()).await.unwrap();
        assert_eq!(view.rooms, 1);
        assert_eq!(view.in_rooms, 1);

        stats
            .record(&game(), &player("alice"), StatsEvent::RoomClose)
            .await
            .unwrap();
        let view = stats.view(&game()).await.unwrap();
        assert_eq!(view.rooms, 0);
    }

    #[tokio::test]
    async fn player_record_tracks_sessions_and_playtime() {
        let stats = accumulator();
        stats
            .record(&game(), &player("alice"), StatsEvent::SessionStart)
            .await
            .unwrap();
        stats
            .record(
                &game(),
                &player("alice"),
                StatsEvent::SessionEnd {
                    playtime_secs: Some(90),
                },
            )
            .await
            .unwrap();
        stats
            .record(&game(), &player("alice"), StatsEvent::SessionStart)
            .await
            .unwrap();

        let record = stats.player_view(&game(), &player("alice")).await.unwrap();
        assert_eq!(record.sessions, 2);
        assert_eq!(record.playtime, 90);
        assert!(record.first_seen.is_some());
        assert!(record.last_seen >= record.first_seen);
    }

    #[tokio::test]
    async fn unknown_player_record_is_zero_filled() {
        let stats = accumulator();
        let record = stats.player_view(&game(), &player("ghost")).await.unwrap();
        assert_eq!(record.sessions, 0);
        assert_eq!(record.playtime, 0);
        assert!(record.first_seen.is_none());
    }

    #[tokio::test]
    async fn concurrent_starts_do_not_lose_updates() {
        let stats = Arc::new(accumulator());
        let mut handles = Vec::new();
        for i in 0..20 {
            let stats = Arc::clone(&stats);
            handles.push(tokio::spawn(async move {
                stats
                    .record(
                        &GameId::from("g1"),
                        &PlayerId::new(format!("p{i}")),
                        StatsEvent::SessionStart,
                    )
                    .await
                    .unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let view = stats.view(&GameId::from("g1")).await.unwrap();
        assert_eq!(view.online, 20);
        assert_eq!(view.today, 20);
        assert_eq!(view.total, 20);
    }

    #[test]
    fn event_names_parse() {
        assert_eq!(StatsEvent::parse("session_start"), Some(StatsEvent::SessionStart));
        assert_eq!(StatsEvent::parse("room_close"), Some(StatsEvent::RoomClose));
        assert_eq!(StatsEvent::parse("unknown_event"), None);
    }
}
