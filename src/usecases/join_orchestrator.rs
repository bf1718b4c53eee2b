//! Join orchestration: route a classified invite to its backend, translate the
//! result, and record membership in the chat registry before answering.
//!
//! - `PublicHandle` -> service identity (bot), membership check only
//! - `PrivateHash` -> delegated session, via the single-owner session queue
//! - No fallback between backends
//! - Registry upsert completes before a success result is returned
//! - An attempt that has started is always recorded, even if nobody waits for it

use crate::domain::{
    ChatRecord, DomainError, FailReason, InviteReference, JoinAttemptResult, JoinOutcome,
    LinkKind, PlatformError, RejectReason, ResolvedChat,
};
use crate::ports::{ChatRegistryPort, JoinBackend, ProviderOutcome, ProviderResult};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Orchestrates joins over two backends and the chat registry.
pub struct JoinOrchestrator {
    public: Arc<dyn JoinBackend>,
    private: Arc<dyn JoinBackend>,
    registry: Arc<dyn ChatRegistryPort>,
    public_timeout: Duration,
}

impl JoinOrchestrator {
    /// `public_timeout` bounds public lookups. Private joins are bounded by the
    /// session queue, which never drops an attempt that has started.
    pub fn new(
        public: Arc<dyn JoinBackend>,
        private: Arc<dyn JoinBackend>,
        registry: Arc<dyn ChatRegistryPort>,
        public_timeout: Duration,
    ) -> Self {
        Self {
            public,
            private,
            registry,
            public_timeout,
        }
    }

    fn backend_for(&self, kind: LinkKind) -> Arc<dyn JoinBackend> {
        match kind {
            LinkKind::PublicHandle => Arc::clone(&self.public),
            LinkKind::PrivateHash => Arc::clone(&self.private),
        }
    }

    /// Join the chat behind `reference`. Never fails: every path ends in a
    /// [`JoinAttemptResult`].
    ///
    /// Attempt and registry write run together on their own task, so a caller that
    /// goes away cannot leave a joined chat unrecorded, and a panic still produces
    /// a result.
    pub async fn join(&self, reference: &InviteReference) -> JoinAttemptResult {
        info!(
            reference = %reference.normalized,
            kind = ?reference.kind,
            "join attempt"
        );

        let backend = self.backend_for(reference.kind);
        let registry = Arc::clone(&self.registry);
        let owned = reference.clone();
        let mut task = tokio::spawn(async move {
            let result = backend.attempt(&owned.identifier).await;
            record_result(registry.as_ref(), owned, result).await
        });

        let joined = match reference.kind {
            LinkKind::PublicHandle => {
                match tokio::time::timeout(self.public_timeout, &mut task).await {
                    Ok(joined) => joined,
                    Err(_) => {
                        task.abort();
                        let result = unrecorded(reference, Err(PlatformError::Timeout.into()));
                        log_outcome(&result);
                        return result;
                    }
                }
            }
            LinkKind::PrivateHash => task.await,
        };

        let result = joined.unwrap_or_else(|join_err| {
            error!(error = %join_err, "join task failed");
            unrecorded(
                reference,
                Err(PlatformError::Unknown(format!("join task failed: {}", join_err)).into()),
            )
        });
        log_outcome(&result);
        result
    }
}

fn unrecorded(reference: &InviteReference, result: ProviderResult) -> JoinAttemptResult {
    let (outcome, resolved) = outcome_of(result);
    JoinAttemptResult {
        reference: reference.clone(),
        outcome,
        chat: None,
        member_count: resolved.and_then(|c| c.member_count),
    }
}

/// Map a backend result and upsert the chat when it ended in membership.
async fn record_result(
    registry: &dyn ChatRegistryPort,
    reference: InviteReference,
    result: ProviderResult,
) -> JoinAttemptResult {
    let (outcome, resolved) = outcome_of(result);
    let mut result = JoinAttemptResult {
        member_count: resolved.as_ref().and_then(|c| c.member_count),
        reference,
        outcome,
        chat: None,
    };

    if let Some(chat) = resolved.filter(|_| result.outcome.is_member()) {
        let record =
            ChatRecord::from_resolved(&chat, Some(&result.reference.normalized), Utc::now());
        match registry.upsert(record.clone()).await {
            Ok(()) => {
                // The registry keeps the first `joined_at` of known chats; report that one.
                let stored = registry.get(record.id).await.ok().flatten();
                result.chat = Some(stored.unwrap_or(record));
            }
            Err(e) => {
                error!(chat_id = chat.id, error = %e, "joined but registry write failed");
                result.outcome = JoinOutcome::PartialSuccess {
                    storage_error: e.to_string(),
                };
                result.chat = Some(record);
            }
        }
    }
    result
}

/// The single mapping from any backend result to a join outcome.
pub fn outcome_of(result: ProviderResult) -> (JoinOutcome, Option<ResolvedChat>) {
    match result {
        Ok(ProviderOutcome::Joined(chat)) => (JoinOutcome::Joined, Some(chat)),
        Ok(ProviderOutcome::AlreadyMember(chat)) => (JoinOutcome::AlreadyMember, chat),
        Err(e) => (outcome_of_error(e), None),
    }
}

fn outcome_of_error(e: DomainError) -> JoinOutcome {
    match e {
        DomainError::Capability(_) => JoinOutcome::Rejected(RejectReason::ManualAdditionRequired),
        DomainError::Session(_) => JoinOutcome::Failed(FailReason::SessionUnavailable),
        DomainError::Format(_) => JoinOutcome::Rejected(RejectReason::Invalid),
        DomainError::Platform(p) => match p {
            PlatformError::AlreadyMember => JoinOutcome::AlreadyMember,
            PlatformError::Expired => JoinOutcome::Rejected(RejectReason::Expired),
            PlatformError::Invalid => JoinOutcome::Rejected(RejectReason::Invalid),
            PlatformError::NotFound => JoinOutcome::Rejected(RejectReason::ChatNotFound),
            PlatformError::Forbidden => JoinOutcome::Rejected(RejectReason::Forbidden),
            PlatformError::RateLimited { retry_after_secs } => {
                JoinOutcome::Failed(FailReason::RateLimited { retry_after_secs })
            }
            PlatformError::Timeout => JoinOutcome::Failed(FailReason::Timeout),
            PlatformError::Unknown(detail) => JoinOutcome::Failed(FailReason::Unknown(detail)),
        },
        other @ (DomainError::Storage(_) | DomainError::Auth(_)) => {
            JoinOutcome::Failed(FailReason::Unknown(other.to_string()))
        }
    }
}

fn log_outcome(result: &JoinAttemptResult) {
    let reference = result.reference.normalized.as_str();
    let chat_id = result.chat.as_ref().map(|c| c.id);
    match &result.outcome {
        JoinOutcome::Joined | JoinOutcome::AlreadyMember => {
            info!(reference, ?chat_id, outcome = ?result.outcome, "join succeeded")
        }
        JoinOutcome::PartialSuccess { storage_error } => {
            warn!(reference, ?chat_id, storage_error = %storage_error, "joined, not recorded")
        }
        JoinOutcome::Rejected(reason) => warn!(reference, %reason, "join rejected"),
        JoinOutcome::Failed(reason) => warn!(reference, %reason, detail = ?reason, "join failed"),
    }
}
