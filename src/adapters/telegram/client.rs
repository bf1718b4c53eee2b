//! Implements SessionProvider using grammers Client.
//!
//! Uses raw invoke for ImportChatInvite / CheckChatInvite. No retries here: FloodWait is
//! reported as RateLimited and the caller decides.

use crate::adapters::telegram::mapper;
use crate::domain::{DomainError, PlatformError, ResolvedChat};
use crate::ports::{ProviderOutcome, SessionProvider};
use async_trait::async_trait;
use grammers_client::Client;
use grammers_client::InvocationError;
use grammers_client::tl;
use tracing::{debug, info, warn};

/// Delegated session adapter. `None` when api id/hash are not configured.
pub struct GrammersSessionProvider {
    client: Option<Client>,
}

impl GrammersSessionProvider {
    pub fn new(client: Option<Client>) -> Self {
        Self { client }
    }

    /// Look the invite up without joining. Used when the import answer carries no chat,
    /// and when we turn out to be a member already.
    async fn resolve_invite(
        &self,
        client: &Client,
        hash: &str,
    ) -> Result<Option<ResolvedChat>, PlatformError> {
        let req = tl::functions::messages::CheckChatInvite {
            hash: hash.to_string(),
        };
        let invite = client.invoke(&req).await.map_err(|e| mapper::platform_error(&e))?;
        Ok(mapper::chat_from_invite(&invite))
    }
}

#[async_trait]
impl SessionProvider for GrammersSessionProvider {
    fn is_configured(&self) -> bool {
        self.client.is_some()
    }

    async fn is_authorized(&self) -> Result<bool, DomainError> {
        let Some(client) = &self.client else {
            return Ok(false);
        };
        client
            .is_authorized()
            .await
            .map_err(|e| DomainError::Session(e.to_string()))
    }

    async fn join(&self, invite_hash: &str) -> Result<ProviderOutcome, PlatformError> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| PlatformError::Unknown("delegated session not configured".into()))?;

        let req = tl::functions::messages::ImportChatInvite {
            hash: invite_hash.to_string(),
        };
        match client.invoke(&req).await {
            Ok(updates) => {
                let chat = match mapper::chat_from_updates(&updates) {
                    Some(chat) => chat,
                    None => {
                        debug!(invite_hash, "import answer without chat; checking invite");
                        self.resolve_invite(client, invite_hash)
                            .await?
                            .ok_or_else(|| {
                                PlatformError::Unknown("joined chat could not be resolved".into())
                            })?
                    }
                };
                info!(chat_id = chat.id, title = %chat.title, "invite imported");
                Ok(ProviderOutcome::Joined(chat))
            }
            Err(InvocationError::Rpc(rpc)) if rpc.name == "USER_ALREADY_PARTICIPANT" => {
                let chat = match self.resolve_invite(client, invite_hash).await {
                    Ok(chat) => chat,
                    Err(e) => {
                        warn!(invite_hash, error = %e, "already a member; chat lookup failed");
                        None
                    }
                };
                Ok(ProviderOutcome::AlreadyMember(chat))
            }
            Err(e) => {
                let mapped = mapper::platform_error(&e);
                warn!(invite_hash, error = %e, mapped = %mapped, "invite import failed");
                Err(mapped)
            }
        }
    }
}
