//! Per-player save storage.
//!
//! A thin, eventually-consistent wrapper over the shared KV namespace.
//! The interesting part is the key layout: saves live under the bare
//! `<gameId>:<playerId>:<saveKey>` composite form, co-tenant with the
//! prefixed namespaces and kept disjoint from them by the builders in
//! [`crate::storage::keys`].

use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

use crate::protocol::{GameId, PlayerId, MAX_SAVE_BYTES};
use crate::storage::{keys, KvStore};

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("save payload exceeds {MAX_SAVE_BYTES} bytes")]
    TooLarge,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Save operations, all scoped by the authenticated `(gameId, playerId)`.
#[derive(Clone)]
pub struct SavesStore {
    store: Arc<dyn KvStore>,
}

impl SavesStore {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// Store a JSON value verbatim, overwriting any previous value.
    pub async fn put(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        save_key: &str,
        value: Value,
    ) -> Result<(), SaveError> {
        let encoded_len = serde_json::to_vec(&value)
            .map_err(anyhow::Error::from)?
            .len();
        if encoded_len > MAX_SAVE_BYTES {
            return Err(SaveError::TooLarge);
        }
        self.store
            .put(&keys::save(game_id, player_id, save_key), value)
            .await?;
        Ok(())
    }

    pub async fn get(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        save_key: &str,
    ) -> Result<Option<Value>, SaveError> {
        Ok(self
            .store
            .get(&keys::save(game_id, player_id, save_key))
            .await?)
    }

    /// Save keys belonging to this player, with the scope prefix stripped.
    pub async fn list(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
    ) -> Result<Vec<String>, SaveError> {
        let scope = keys::save_scope(game_id, player_id);
        let mut save_keys: Vec<String> = self
            .store
            .list_prefix(&scope)
            .await?
            .into_iter()
            .filter_map(|key| key.strip_prefix(&scope).map(str::to_string))
            .collect();
        save_keys.sort();
        Ok(save_keys)
    }

    /// Idempotent delete.
    pub async fn delete(
        &self,
        game_id: &GameId,
        player_id: &PlayerId,
        save_key: &str,
    ) -> Result<(), SaveError> {
        self.store
            .delete(&keys::save(game_id, player_id, save_key))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryKvStore;
    use serde_json::json;

    fn saves() -> SavesStore {
        SavesStore::new(Arc::new(InMemoryKvStore::new()))
    }

    fn scope() -> (GameId, PlayerId) {
        (GameId::from("g1"), PlayerId::from("alice"))
    }

    #[tokio::test]
    async fn save_round_trips_bytewise() {
        let saves = saves();
        let (game, player) = scope();
        let value = json!({"progress": {"level": 3, "items": ["sword", "map"]}});

        saves.put(&game, &player, "slot1", value.clone()).await.unwrap();
        let loaded = saves.get(&game, &player, "slot1").await.unwrap().unwrap();
        assert_eq!(
            serde_json::to_vec(&loaded).unwrap(),
            serde_json::to_vec(&value).unwrap()
        );
    }

    #[tokio::test]
    async fn put_overwrites_existing_value() {
        let saves = saves();
        let (game, player) = scope();
        saves.put(&game, &player, "slot1", json!(1)).await.unwrap();
        saves.put(&game, &player, "slot1", json!(2)).await.unwrap();
        assert_eq!(
            saves.get(&game, &player, "slot1").await.unwrap(),
            Some(json!(2))
        );
    }

    #[tokio::test]
    async fn list_is_scoped_to_the_player() {
        let saves = saves();
        let (game, alice) = scope();
        let bob = PlayerId::from("bob");
        saves.put(&game, &alice, "slot1", json!(1)).await.unwrap();
        saves.put(&game, &alice, "slot2", json!(2)).await.unwrap();
        saves.put(&game, &bob, "slot1", json!(3)).await.unwrap();

        assert_eq!(saves.list(&game, &alice).await.unwrap(), vec!["slot1", "slot2"]);
        assert_eq!(saves.list(&game, &bob).await.unwrap(), vec!["slot1"]);
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let saves = saves();
        let (game, player) = scope();
        saves.put(&game, &player, "slot1", json!(1)).await.unwrap();
        saves.delete(&game, &player, "slot1").await.unwrap();
        saves.delete(&game, &player, "slot1").await.unwrap();
        assert_eq!(saves.get(&game, &player, "slot1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn deeply_nested_values_survive() {
        let saves = saves();
        let (game, player) = scope();
        let mut value = json!("leaf");
        for _ in 0..64 {
            value = json!({ "next": value });
        }
        saves.put(&game, &player, "deep", value.clone()).await.unwrap();
        assert_eq!(
            saves.get(&game, &player, "deep").await.unwrap(),
            Some(value)
        );
    }
}
