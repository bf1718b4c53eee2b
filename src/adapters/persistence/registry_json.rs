//! Implements ChatRegistryPort using a JSON file.
//!
//! Layout: `{ "chats": { "<id>": { title, type, origin_reference, joined_at, last_broadcast_at } } }`.
//! The in-memory cache always equals what is on disk: mutations are applied to a copy,
//! persisted, and only then swapped in.

use crate::adapters::persistence::write_atomic;
use crate::domain::{ChatRecord, ChatType, DomainError};
use crate::ports::ChatRegistryPort;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct StoredChat {
    title: String,
    #[serde(rename = "type")]
    chat_type: ChatType,
    #[serde(default)]
    origin_reference: Option<String>,
    joined_at: DateTime<Utc>,
    #[serde(default)]
    last_broadcast_at: Option<DateTime<Utc>>,
}

/// chat_id -> chat. Keys are strings in JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
struct RegistryData {
    chats: BTreeMap<i64, StoredChat>,
}

impl RegistryData {
    fn record(id: i64, c: &StoredChat) -> ChatRecord {
        ChatRecord {
            id,
            title: c.title.clone(),
            chat_type: c.chat_type,
            origin_reference: c.origin_reference.clone(),
            joined_at: c.joined_at,
            last_broadcast_at: c.last_broadcast_at,
        }
    }
}

/// JSON file-based chat registry.
pub struct RegistryJson {
    path: PathBuf,
    cache: RwLock<RegistryData>,
}

impl RegistryJson {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            cache: RwLock::new(RegistryData::default()),
        }
    }

    /// Load registry from disk. Missing file is an empty registry; an unreadable or
    /// corrupt file is also treated as empty, with a warning.
    pub async fn load(&self) -> Result<(), DomainError> {
        let data = match fs::read_to_string(&self.path).await {
            Ok(s) => match serde_json::from_str(&s) {
                Ok(d) => d,
                Err(e) => {
                    warn!(path = %self.path.display(), error = %e, "chat registry corrupt; starting empty");
                    RegistryData::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => RegistryData::default(),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "chat registry unreadable; starting empty");
                RegistryData::default()
            }
        };
        info!(
            path = %self.path.display(),
            chats = data.chats.len(),
            "chat registry loaded"
        );
        *self.cache.write().await = data;
        Ok(())
    }

    async fn persist(&self, data: &RegistryData) -> Result<(), DomainError> {
        let json =
            serde_json::to_string_pretty(data).map_err(|e| DomainError::Storage(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())
            .await
            .map_err(|e| DomainError::Storage(format!("write {}: {}", self.path.display(), e)))
    }

    /// Apply `f` to a copy; persist and swap in if it changed anything.
    /// The write lock is held across the save so mutations are serialized.
    async fn mutate<T>(
        &self,
        f: impl FnOnce(&mut RegistryData) -> T,
    ) -> Result<T, DomainError> {
        let mut cache = self.cache.write().await;
        let mut next = cache.clone();
        let out = f(&mut next);
        if next != *cache {
            self.persist(&next).await?;
            *cache = next;
        }
        Ok(out)
    }
}

#[async_trait::async_trait]
impl ChatRegistryPort for RegistryJson {
    async fn upsert(&self, record: ChatRecord) -> Result<(), DomainError> {
        let id = record.id;
        self.mutate(|data| match data.chats.get_mut(&record.id) {
            Some(existing) => {
                existing.title = record.title;
                existing.chat_type = record.chat_type;
            }
            None => {
                data.chats.insert(
                    record.id,
                    StoredChat {
                        title: record.title,
                        chat_type: record.chat_type,
                        origin_reference: record.origin_reference,
                        joined_at: record.joined_at,
                        last_broadcast_at: record.last_broadcast_at,
                    },
                );
            }
        })
        .await?;
        debug!(chat_id = id, "chat upserted");
        Ok(())
    }

    async fn remove(&self, chat_id: i64) -> Result<bool, DomainError> {
        let removed = self.mutate(|data| data.chats.remove(&chat_id)).await?;
        match &removed {
            Some(c) => info!(chat_id, title = %c.title, "chat removed from registry"),
            None => warn!(chat_id, "chat not in registry"),
        }
        Ok(removed.is_some())
    }

    async fn list_all(&self) -> Result<Vec<ChatRecord>, DomainError> {
        let cache = self.cache.read().await;
        Ok(cache
            .chats
            .iter()
            .map(|(id, c)| RegistryData::record(*id, c))
            .collect())
    }

    async fn get(&self, chat_id: i64) -> Result<Option<ChatRecord>, DomainError> {
        let cache = self.cache.read().await;
        Ok(cache
            .chats
            .get(&chat_id)
            .map(|c| RegistryData::record(chat_id, c)))
    }

    async fn exists(&self, chat_id: i64) -> Result<bool, DomainError> {
        Ok(self.cache.read().await.chats.contains_key(&chat_id))
    }

    async fn mark_broadcast(&self, chat_id: i64, at: DateTime<Utc>) -> Result<(), DomainError> {
        self.mutate(|data| {
            if let Some(c) = data.chats.get_mut(&chat_id) {
                c.last_broadcast_at = Some(at);
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(id: i64, title: &str) -> ChatRecord {
        ChatRecord {
            id,
            title: title.to_string(),
            chat_type: ChatType::Supergroup,
            origin_reference: Some("https://t.me/+abc".into()),
            joined_at: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            last_broadcast_at: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_twice_is_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chat_registry.json");
        let reg = RegistryJson::new(&path);
        reg.load().await.unwrap();

        reg.upsert(record(-1001, "A")).await.unwrap();
        let first = std::fs::read_to_string(&path).unwrap();
        reg.upsert(record(-1001, "A")).await.unwrap();
        let second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(first, second);
        assert_eq!(reg.list_all().await.unwrap(), vec![record(-1001, "A")]);
    }

    #[tokio::test]
    async fn test_upsert_existing_updates_title_only() {
        let dir = tempfile::tempdir().unwrap();
        let reg = RegistryJson::new(dir.path().join("r.json"));
        reg.upsert(record(-1001, "Old")).await.unwrap();
        let stamp = Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap();
        reg.mark_broadcast(-1001, stamp).await.unwrap();

        let mut again = record(-1001, "New");
        again.chat_type = ChatType::Channel;
        again.joined_at = Utc.with_ymd_and_hms(2030, 1, 1, 0, 0, 0).unwrap();
        again.origin_reference = None;
        reg.upsert(again).await.unwrap();

        let got = reg.get(-1001).await.unwrap().unwrap();
        assert_eq!(got.title, "New");
        assert_eq!(got.chat_type, ChatType::Channel);
        assert_eq!(got.joined_at, record(0, "").joined_at);
        assert_eq!(got.origin_reference.as_deref(), Some("https://t.me/+abc"));
        assert_eq!(got.last_broadcast_at, Some(stamp));
    }

    #[tokio::test]
    async fn test_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("r.json");
        let reg = RegistryJson::new(&path);
        reg.upsert(record(-1001, "A")).await.unwrap();
        reg.upsert(record(-42, "B")).await.unwrap();
        assert!(reg.remove(-42).await.unwrap());
        assert!(!reg.remove(-42).await.unwrap());

        let reopened = RegistryJson::new(&path);
        reopened.load().await.unwrap();
        assert!(reopened.exists(-1001).await.unwrap());
        assert!(!reopened.exists(-42).await.unwrap());
        assert_eq!(reopened.get(-1001).await.unwrap(), Some(record(-1001, "A")));
        assert_eq!(reopened.get(-42).await.unwrap(), None);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["chats"]["-1001"]["type"], "supergroup");
        assert!(raw["chats"]["-1001"]["last_broadcast_at"].is_null());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        std::fs::write(&path, "{ not json").unwrap();
        let reg = RegistryJson::new(&path);
        reg.load().await.unwrap();
        assert!(reg.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_mark_broadcast_unknown_id_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("r.json");
        let reg = RegistryJson::new(&path);
        reg.mark_broadcast(7, Utc::now()).await.unwrap();
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_failed_write_leaves_cache_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        // Parent is a regular file, so create_dir_all fails.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let reg = RegistryJson::new(blocker.join("r.json"));

        let err = reg.upsert(record(-1001, "A")).await.unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
        assert!(!reg.exists(-1001).await.unwrap());
    }
}
