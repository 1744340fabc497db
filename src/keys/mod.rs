//! API key registry.
//!
//! Maps `apikey:<key>` to the owning game and project. Written only by the
//! authenticated admin plane; read on every public request by the auth
//! gate. Records are immutable after creation — key rotation is a delete
//! followed by an insert of a fresh key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::protocol::{GameId, API_KEY_PREFIX};
use crate::storage::{keys, KvStore};

#[derive(Debug, Error)]
pub enum KeyRegistryError {
    #[error("API key must be non-empty and start with `{API_KEY_PREFIX}`")]
    BadFormat,
    #[error("gameId and projectId must be non-empty")]
    MissingField,
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

/// Stored record for one API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiKeyRecord {
    pub game_id: GameId,
    pub project_id: String,
    pub created_at: DateTime<Utc>,
}

/// CRUD surface over the `apikey:` prefix of the shared namespace.
#[derive(Clone)]
pub struct KeyRegistry {
    store: Arc<dyn KvStore>,
}

impl KeyRegistry {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    fn validate_key(api_key: &str) -> Result<(), KeyRegistryError> {
        if api_key.is_empty() || !api_key.starts_with(API_KEY_PREFIX) {
            return Err(KeyRegistryError::BadFormat);
        }
        Ok(())
    }

    /// Store a key → game mapping. Idempotent under equal input:
    /// re-putting an unchanged mapping is a no-op that keeps the
    /// original `created_at`. Only a new or changed mapping gets a
    /// fresh record.
    pub async fn put(
        &self,
        api_key: &str,
        game_id: &str,
        project_id: &str,
    ) -> Result<ApiKeyRecord, KeyRegistryError> {
        Self::validate_key(api_key)?;
        if game_id.is_empty() || project_id.is_empty() {
            return Err(KeyRegistryError::MissingField);
        }

        let storage_key = keys::api_key(api_key);
        let existing: Option<ApiKeyRecord> = self
            .store
            .get(&storage_key)
            .await?
            .and_then(|value| serde_json::from_value(value).ok());
        if let Some(existing) = existing {
            if existing.game_id.as_str() == game_id && existing.project_id == project_id {
                return Ok(existing);
            }
        }

        let record = ApiKeyRecord {
            game_id: GameId::new(game_id),
            project_id: project_id.to_string(),
            created_at: Utc::now(),
        };
        let value = serde_json::to_value(&record).map_err(anyhow::Error::from)?;
        self.store.put(&storage_key, value).await?;
        tracing::info!(game_id, project_id, "API key registered");
        Ok(record)
    }

    /// Remove a key mapping. No-op when absent.
    pub async fn delete(&self, api_key: &str) -> Result<(), KeyRegistryError> {
        Self::validate_key(api_key)?;
        self.store.delete(&keys::api_key(api_key)).await?;
        tracing::info!("API key revoked");
        Ok(())
    }

    /// Resolve a key to its record, or `None` when absent.
    pub async fn get(&self, api_key: &str) -> Result<Option<ApiKeyRecord>, KeyRegistryError> {
        Self::validate_key(api_key)?;
        let Some(value) = self.store.get(&keys::api_key(api_key)).await? else {
            return Ok(None);
        };
        let record = serde_json::from_value(value).map_err(anyhow::Error::from)?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryKvStore;

    fn registry() -> KeyRegistry {
        KeyRegistry::new(Arc::new(InMemoryKvStore::new()))
    }

    #[tokio::test]
    async fn put_then_get_returns_record() {
        let registry = registry();
        registry.put("wt_abc", "game-1", "proj-1").await.unwrap();

        let record = registry.get("wt_abc").await.unwrap().unwrap();
        assert_eq!(record.game_id.as_str(), "game-1");
        assert_eq!(record.project_id, "proj-1");
    }

    #[tokio::test]
    async fn put_rejects_missing_prefix() {
        let registry = registry();
        let err = registry.put("sk_abc", "g", "p").await.unwrap_err();
        assert!(matches!(err, KeyRegistryError::BadFormat));

        let err = registry.put("", "g", "p").await.unwrap_err();
        assert!(matches!(err, KeyRegistryError::BadFormat));
    }

    #[tokio::test]
    async fn put_rejects_empty_fields() {
        let registry = registry();
        let err = registry.put("wt_abc", "", "proj").await.unwrap_err();
        assert!(matches!(err, KeyRegistryError::MissingField));

        let err = registry.put("wt_abc", "game", "").await.unwrap_err();
        assert!(matches!(err, KeyRegistryError::MissingField));
    }

    #[tokio::test]
    async fn repeated_put_with_equal_input_preserves_created_at() {
        let registry = registry();
        let first = registry.put("wt_abc", "game-1", "proj-1").await.unwrap();
        let second = registry.put("wt_abc", "game-1", "proj-1").await.unwrap();
        assert_eq!(second.created_at, first.created_at);

        let stored = registry.get("wt_abc").await.unwrap().unwrap();
        assert_eq!(stored.created_at, first.created_at);
    }

    #[tokio::test]
    async fn put_with_changed_mapping_replaces_the_record() {
        let registry = registry();
        let first = registry.put("wt_abc", "game-1", "proj-1").await.unwrap();
        let second = registry.put("wt_abc", "game-2", "proj-1").await.unwrap();
        assert_eq!(second.game_id.as_str(), "game-2");
        assert!(second.created_at >= first.created_at);

        let stored = registry.get("wt_abc").await.unwrap().unwrap();
        assert_eq!(stored.game_id.as_str(), "game-2");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let registry = registry();
        registry.put("wt_abc", "g", "p").await.unwrap();
        registry.delete("wt_abc").await.unwrap();
        registry.delete("wt_abc").await.unwrap();
        assert!(registry.get("wt_abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_absent_key_is_none() {
        let registry = registry();
        assert!(registry.get("wt_missing").await.unwrap().is_none());
    }
}
