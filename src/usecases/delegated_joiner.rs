//! Private-hash backend. Imports invites through the delegated user session.
//!
//! Must only be driven from the session worker; see [`crate::usecases::session_worker`].

use crate::domain::{DomainError, FailReason};
use crate::ports::{JoinBackend, ProviderResult, SessionProvider};
use tracing::{info, warn};

pub struct DelegatedIdentityJoiner {
    session: Box<dyn SessionProvider>,
}

impl DelegatedIdentityJoiner {
    pub fn new(session: Box<dyn SessionProvider>) -> Self {
        Self { session }
    }

    fn unavailable() -> DomainError {
        DomainError::Session(FailReason::SessionUnavailable.to_string())
    }
}

#[async_trait::async_trait]
impl JoinBackend for DelegatedIdentityJoiner {
    async fn attempt(&self, invite_hash: &str) -> ProviderResult {
        if !self.session.is_configured() {
            warn!("delegated session not configured; private invites unavailable");
            return Err(Self::unavailable());
        }
        match self.session.is_authorized().await {
            Ok(true) => {}
            Ok(false) => {
                warn!("delegated session not authorized; run the login flow");
                return Err(Self::unavailable());
            }
            Err(e) => {
                warn!(error = %e, "delegated session authorization check failed");
                return Err(Self::unavailable());
            }
        }

        info!(invite_hash, "delegated session importing invite");
        self.session.join(invite_hash).await.map_err(DomainError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatType, PlatformError, ResolvedChat};
    use crate::ports::ProviderOutcome;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSession {
        configured: bool,
        authorized: bool,
        network_calls: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl SessionProvider for FakeSession {
        fn is_configured(&self) -> bool {
            self.configured
        }

        async fn is_authorized(&self) -> Result<bool, DomainError> {
            self.network_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.authorized)
        }

        async fn join(&self, hash: &str) -> Result<ProviderOutcome, PlatformError> {
            self.network_calls.fetch_add(1, Ordering::SeqCst);
            if hash == "expired" {
                return Err(PlatformError::Expired);
            }
            Ok(ProviderOutcome::Joined(ResolvedChat {
                id: -100777,
                title: "Private".into(),
                chat_type: ChatType::Supergroup,
                member_count: Some(12),
                username: None,
            }))
        }
    }

    fn joiner(configured: bool, authorized: bool) -> (DelegatedIdentityJoiner, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        let session = FakeSession {
            configured,
            authorized,
            network_calls: Arc::clone(&calls),
        };
        (DelegatedIdentityJoiner::new(Box::new(session)), calls)
    }

    #[tokio::test]
    async fn test_unconfigured_makes_no_network_calls() {
        let (j, calls) = joiner(false, true);
        let r = j.attempt("AbC").await;
        assert_eq!(r, Err(DomainError::Session("session-unavailable".into())));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unauthorized_does_not_join() {
        let (j, calls) = joiner(true, false);
        assert!(matches!(j.attempt("AbC").await, Err(DomainError::Session(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_join_and_error_translation() {
        let (j, _) = joiner(true, true);
        assert!(matches!(
            j.attempt("AbC").await,
            Ok(ProviderOutcome::Joined(ResolvedChat { id: -100777, .. }))
        ));
        assert_eq!(
            j.attempt("expired").await,
            Err(DomainError::Platform(PlatformError::Expired))
        );
    }
}
