//! classify -> join -> list -> broadcast through the public API, with fake backends
//! and the real JSON registry.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tg_autojoin::adapters::persistence::RegistryJson;
use tg_autojoin::domain::invite::classify;
use tg_autojoin::domain::{
    ChatType, DomainError, FailReason, JoinOutcome, PlatformError, RejectReason, ResolvedChat,
    SendFailure,
};
use tg_autojoin::ports::{
    ChatRegistryPort, MessageSender, ProviderOutcome, ServiceIdentityPort, SessionProvider,
};
use tg_autojoin::usecases::{
    BroadcastDispatcher, DelegatedIdentityJoiner, JoinOrchestrator, ServiceIdentityJoiner,
    SessionWorker,
};
use tokio_util::sync::CancellationToken;

/// Bot that is a member of `@news` only.
struct FakeBot;

#[async_trait::async_trait]
impl ServiceIdentityPort for FakeBot {
    async fn lookup_chat(&self, handle: &str) -> Result<ResolvedChat, PlatformError> {
        match handle {
            "news" => Ok(ResolvedChat {
                id: -1001,
                title: "News".into(),
                chat_type: ChatType::Channel,
                member_count: Some(1200),
                username: Some("news".into()),
            }),
            "other" => Ok(ResolvedChat {
                id: -1002,
                title: "Other".into(),
                chat_type: ChatType::Supergroup,
                member_count: None,
                username: Some("other".into()),
            }),
            _ => Err(PlatformError::NotFound),
        }
    }

    async fn is_self_member(&self, chat_id: i64) -> Result<bool, PlatformError> {
        Ok(chat_id == -1001)
    }
}

/// User session that can import `AbCdEf123`; everything else is expired.
struct FakeSession {
    configured: bool,
}

#[async_trait::async_trait]
impl SessionProvider for FakeSession {
    fn is_configured(&self) -> bool {
        self.configured
    }

    async fn is_authorized(&self) -> Result<bool, DomainError> {
        Ok(true)
    }

    async fn join(&self, invite_hash: &str) -> Result<ProviderOutcome, PlatformError> {
        if invite_hash != "AbCdEf123" {
            return Err(PlatformError::Expired);
        }
        Ok(ProviderOutcome::Joined(ResolvedChat {
            id: -1003,
            title: "Private".into(),
            chat_type: ChatType::Supergroup,
            member_count: Some(8),
            username: None,
        }))
    }
}

/// Fails sends to the ids in `fail`.
#[derive(Default)]
struct FakeSender {
    fail: HashSet<i64>,
    delivered: Mutex<Vec<i64>>,
}

#[async_trait::async_trait]
impl MessageSender for FakeSender {
    async fn send_text(&self, chat_id: i64, _text: &str) -> Result<(), PlatformError> {
        if self.fail.contains(&chat_id) {
            return Err(PlatformError::Forbidden);
        }
        self.delivered.lock().unwrap().push(chat_id);
        Ok(())
    }
}

async fn orchestrator(
    registry: Arc<dyn ChatRegistryPort>,
    session_configured: bool,
) -> JoinOrchestrator {
    let session = FakeSession {
        configured: session_configured,
    };
    let queue = SessionWorker::spawn(
        Box::new(DelegatedIdentityJoiner::new(Box::new(session))),
        4,
        Duration::from_secs(5),
    );
    JoinOrchestrator::new(
        Arc::new(ServiceIdentityJoiner::new(Arc::new(FakeBot))),
        Arc::new(queue),
        registry,
        Duration::from_secs(5),
    )
}

#[tokio::test]
async fn join_list_broadcast() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("chat_registry.json");
    let registry_impl = RegistryJson::new(&path);
    registry_impl.load().await.unwrap();
    let registry: Arc<dyn ChatRegistryPort> = Arc::new(registry_impl);
    let orch = orchestrator(Arc::clone(&registry), true).await;

    // Bot is already in @news: recorded as a member.
    let news = orch.join(&classify("@news").unwrap()).await;
    assert_eq!(news.outcome, JoinOutcome::AlreadyMember);
    assert_eq!(news.member_count, Some(1200));

    // Bot is not in @other: nothing recorded.
    let other = orch.join(&classify("t.me/other").unwrap()).await;
    assert_eq!(
        other.outcome,
        JoinOutcome::Rejected(RejectReason::ManualAdditionRequired)
    );
    assert!(other.chat.is_none());

    // Private invite through the session worker.
    let private = orch.join(&classify("https://t.me/+AbCdEf123").unwrap()).await;
    assert_eq!(private.outcome, JoinOutcome::Joined);
    assert_eq!(
        private.chat.as_ref().and_then(|c| c.origin_reference.as_deref()),
        Some("https://t.me/+AbCdEf123")
    );

    let expired = orch.join(&classify("t.me/joinchat/Old").unwrap()).await;
    assert_eq!(expired.outcome, JoinOutcome::Rejected(RejectReason::Expired));

    let ids: Vec<i64> = registry.list_all().await.unwrap().iter().map(|c| c.id).collect();
    assert_eq!(ids, vec![-1003, -1001]);

    // Broadcast: -1003 fails.
    let sender = Arc::new(FakeSender {
        fail: HashSet::from([-1003]),
        ..Default::default()
    });
    let dispatcher = BroadcastDispatcher::new(
        Arc::clone(&sender) as Arc<dyn MessageSender>,
        Arc::clone(&registry),
        5,
        Duration::from_secs(5),
    );
    let report = dispatcher
        .dispatch_all("weekly update", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!((report.total, report.success, report.failed()), (2, 1, 1));
    assert_eq!(report.failures[0].chat_id, -1003);
    assert_eq!(
        report.failures[0].reason,
        SendFailure::Platform(PlatformError::Forbidden)
    );
    assert_eq!(*sender.delivered.lock().unwrap(), vec![-1001]);

    // Only the successful target carries a broadcast timestamp, and it survives a reload.
    let reloaded = RegistryJson::new(&path);
    reloaded.load().await.unwrap();
    let records = reloaded.list_all().await.unwrap();
    let stamped: Vec<i64> = records
        .iter()
        .filter(|c| c.last_broadcast_at.is_some())
        .map(|c| c.id)
        .collect();
    assert_eq!(stamped, vec![-1001]);
}

#[tokio::test]
async fn private_join_without_session_is_unavailable() {
    let dir = tempfile::tempdir().unwrap();
    let registry_impl = RegistryJson::new(dir.path().join("chat_registry.json"));
    registry_impl.load().await.unwrap();
    let registry: Arc<dyn ChatRegistryPort> = Arc::new(registry_impl);
    let orch = orchestrator(Arc::clone(&registry), false).await;

    let result = orch.join(&classify("https://t.me/+AbCdEf123").unwrap()).await;
    assert_eq!(
        result.outcome,
        JoinOutcome::Failed(FailReason::SessionUnavailable)
    );
    assert!(registry.list_all().await.unwrap().is_empty());
}

#[test]
fn malformed_reference_never_reaches_a_backend() {
    let err = classify("not a link").unwrap_err();
    assert!(!err.reason.is_empty());
}
