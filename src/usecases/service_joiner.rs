//! Public-handle backend. The bot cannot add itself to a public chat, so this only
//! confirms existing membership.

use crate::domain::{DomainError, PlatformError, RejectReason};
use crate::ports::{JoinBackend, ProviderOutcome, ProviderResult, ServiceIdentityPort};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct ServiceIdentityJoiner {
    bot: Arc<dyn ServiceIdentityPort>,
}

impl ServiceIdentityJoiner {
    pub fn new(bot: Arc<dyn ServiceIdentityPort>) -> Self {
        Self { bot }
    }
}

/// Rate limits and timeouts say nothing about the chat itself; pass them through.
fn is_transient(e: &PlatformError) -> bool {
    matches!(
        e,
        PlatformError::RateLimited { .. } | PlatformError::Timeout
    )
}

#[async_trait::async_trait]
impl JoinBackend for ServiceIdentityJoiner {
    async fn attempt(&self, handle: &str) -> ProviderResult {
        let chat = match self.bot.lookup_chat(handle).await {
            Ok(chat) => chat,
            Err(e) if is_transient(&e) => return Err(e.into()),
            Err(e) => {
                debug!(handle, error = %e, "public chat lookup failed");
                return Err(PlatformError::NotFound.into());
            }
        };

        let member = match self.bot.is_self_member(chat.id).await {
            Ok(member) => member,
            Err(e) if is_transient(&e) => return Err(e.into()),
            Err(e) => {
                // Membership is usually unreadable exactly when the bot is not in the chat.
                warn!(chat_id = chat.id, error = %e, "cannot check bot membership");
                false
            }
        };

        if member {
            Ok(ProviderOutcome::AlreadyMember(Some(chat)))
        } else {
            Err(DomainError::Capability(
                RejectReason::ManualAdditionRequired.to_string(),
            ))
        }
    }
}
