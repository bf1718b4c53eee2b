//! Implements AccessStorePort using a JSON file.
//!
//! Layout: `{ "authorized_ids": [..], "last_updated": "<rfc3339>" }`.

use crate::adapters::persistence::write_atomic;
use crate::domain::DomainError;
use crate::ports::AccessStorePort;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

#[derive(Debug, Default, Serialize, Deserialize)]
struct AccessData {
    #[serde(default)]
    authorized_ids: Vec<i64>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
}

/// JSON file-based store of authorized user ids.
pub struct AccessJson {
    path: PathBuf,
}

impl AccessJson {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

#[async_trait::async_trait]
impl AccessStorePort for AccessJson {
    async fn load_ids(&self) -> Result<Vec<i64>, DomainError> {
        let data: AccessData = match fs::read_to_string(&self.path).await {
            Ok(s) => serde_json::from_str(&s).unwrap_or_else(|e| {
                warn!(path = %self.path.display(), error = %e, "access file corrupt; no users authorized");
                AccessData::default()
            }),
            Err(_) => AccessData::default(),
        };
        Ok(data.authorized_ids)
    }

    async fn save_ids(&self, ids: &[i64]) -> Result<(), DomainError> {
        let data = AccessData {
            authorized_ids: ids.to_vec(),
            last_updated: Some(Utc::now()),
        };
        let json =
            serde_json::to_string_pretty(&data).map_err(|e| DomainError::Storage(e.to_string()))?;
        write_atomic(&self.path, json.as_bytes())
            .await
            .map_err(|e| DomainError::Storage(format!("write {}: {}", self.path.display(), e)))
    }
}
