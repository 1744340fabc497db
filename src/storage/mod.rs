//! Key/value storage abstraction.
//!
//! One replicated KV namespace backs the Key Registry, Saves Store, Stats
//! Accumulator, and hosting records, partitioned by key prefix. Room
//! snapshots get their own dedicated store instance so actor-scoped state
//! can never collide with tenant data.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::protocol::{GameId, PlayerId, RoomCode};

/// Key builders enforcing the namespace's prefix discipline. Every
/// component goes through these; nobody formats a storage key by hand.
pub mod keys {
    use super::{GameId, PlayerId, RoomCode};

    pub const API_KEY_PREFIX: &str = "apikey:";
    pub const STATS_PREFIX: &str = "stats:";
    pub const PROJECT_PREFIX: &str = "project:";
    pub const SUBDOMAIN_PREFIX: &str = "subdomain:";
    pub const ROOM_SNAPSHOT_PREFIX: &str = "room:";

    pub fn api_key(api_key: &str) -> String {
        format!("{API_KEY_PREFIX}{api_key}")
    }

    /// Saves use the bare `<gameId>:<playerId>:<saveKey>` form.
    pub fn save(game_id: &GameId, player_id: &PlayerId, save_key: &str) -> String {
        format!("{game_id}:{player_id}:{save_key}")
    }

    /// Prefix under which one player's save keys live.
    pub fn save_scope(game_id: &GameId, player_id: &PlayerId) -> String {
        format!("{game_id}:{player_id}:")
    }

    pub fn stats_counters(game_id: &GameId) -> String {
        format!("{STATS_PREFIX}{game_id}")
    }

    pub fn stats_daily(game_id: &GameId, day: &str) -> String {
        format!("{STATS_PREFIX}{game_id}:daily:{day}")
    }

    pub fn stats_monthly(game_id: &GameId, month: &str) -> String {
        format!("{STATS_PREFIX}{game_id}:monthly:{month}")
    }

    pub fn stats_player(game_id: &GameId, player_id: &PlayerId) -> String {
        format!("{STATS_PREFIX}{game_id}:player:{player_id}")
    }

    pub fn room_snapshot(game_id: &GameId, code: &RoomCode) -> String {
        format!("{ROOM_SNAPSHOT_PREFIX}{game_id}:{code}")
    }
}

/// Storage abstraction over a replicated JSON key/value medium.
///
/// Lookup-by-key plus bounded prefix listing; no scans beyond a prefix.
/// TTL is best-effort: expired entries must never be returned, but may be
/// reclaimed lazily.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;

    async fn put(&self, key: &str, value: Value) -> Result<()>;

    /// Store a value that disappears after `ttl`.
    async fn put_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<()>;

    /// Idempotent delete.
    async fn delete(&self, key: &str) -> Result<()>;

    /// Keys beginning with `prefix`, in unspecified order.
    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>>;

    async fn health_check(&self) -> bool;
}

/// Storage configuration. In-memory is the only backend this build ships;
/// the enum keeps call sites stable when a replicated backend is added.
#[derive(Debug, Clone, Default)]
pub enum StoreConfig {
    #[default]
    InMemory,
}

/// Create a store instance based on configuration.
pub fn create_store(config: StoreConfig) -> Box<dyn KvStore> {
    match config {
        StoreConfig::InMemory => Box::new(InMemoryKvStore::new()),
    }
}

#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory KV store for tests and single-instance deployments. Expired
/// entries are dropped lazily on access.
pub struct InMemoryKvStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let now = Utc::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if !entry.is_expired(now) => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }
        // Expired: reclaim under the write lock, re-checking the deadline
        // in case of a concurrent overwrite.
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|e| e.is_expired(now)) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn put(&self, key: &str, value: Value) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: None,
            },
        );
        Ok(())
    }

    async fn put_with_ttl(&self, key: &str, value: Value, ttl: Duration) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Some(Utc::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut entries = self.entries.write().await;
        entries.remove(key);
        Ok(())
    }

    async fn list_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let now = Utc::now();
        let entries = self.entries.read().await;
        Ok(entries
            .iter()
            .filter(|(key, entry)| key.starts_with(prefix) && !entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
