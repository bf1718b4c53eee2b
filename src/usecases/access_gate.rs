//! Who may command the bot. Users unlock it by sending the access code once;
//! their ids are persisted through [`AccessStorePort`].

use crate::domain::DomainError;
use crate::ports::AccessStorePort;
use secrecy::{ExposeSecret, SecretString};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

pub struct AccessGate {
    store: Arc<dyn AccessStorePort>,
    code: Option<SecretString>,
    ids: RwLock<BTreeSet<i64>>,
}

impl AccessGate {
    /// Load authorized ids from the store. With `code == None` nobody new can unlock.
    pub async fn load(
        store: Arc<dyn AccessStorePort>,
        code: Option<SecretString>,
    ) -> Result<Self, DomainError> {
        let ids: BTreeSet<i64> = store.load_ids().await?.into_iter().collect();
        if code.is_none() {
            warn!("no access code configured; only stored users can use the bot");
        }
        info!(authorized = ids.len(), "access list loaded");
        Ok(Self {
            store,
            code,
            ids: RwLock::new(ids),
        })
    }

    pub async fn is_authorized(&self, user_id: i64) -> bool {
        self.ids.read().await.contains(&user_id)
    }

    /// Authorize `user_id` if `attempt` matches the access code. Persists on success.
    pub async fn verify_code(&self, user_id: i64, attempt: &str) -> Result<bool, DomainError> {
        let Some(code) = &self.code else {
            return Ok(false);
        };
        if !constant_time_eq(attempt.trim().as_bytes(), code.expose_secret().as_bytes()) {
            warn!(user_id, "wrong access code");
            return Ok(false);
        }

        let mut ids = self.ids.write().await;
        if ids.insert(user_id) {
            let snapshot: Vec<i64> = ids.iter().copied().collect();
            if let Err(e) = self.store.save_ids(&snapshot).await {
                ids.remove(&user_id);
                return Err(e);
            }
            info!(user_id, "user authorized");
        }
        Ok(true)
    }

    /// Returns false if the id was not authorized.
    pub async fn revoke(&self, user_id: i64) -> Result<bool, DomainError> {
        let mut ids = self.ids.write().await;
        if !ids.remove(&user_id) {
            return Ok(false);
        }
        let snapshot: Vec<i64> = ids.iter().copied().collect();
        if let Err(e) = self.store.save_ids(&snapshot).await {
            ids.insert(user_id);
            return Err(e);
        }
        info!(user_id, "user access revoked");
        Ok(true)
    }

    pub async fn authorized_count(&self) -> usize {
        self.ids.read().await.len()
    }
}

/// Constant-time byte comparison. Length mismatch returns early; the length is not secret.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
