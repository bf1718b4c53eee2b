//! Async task owning the delegated session. Reads join requests from an mpsc channel
//! and runs them one at a time.
//!
//! The worker is the only holder of the backend once spawned, so two private-invite
//! joins can never use the authenticated session at the same time.
//!
//! A request goes through two phases, each bounded by the same timeout:
//! - waiting in the queue, which the caller may abandon
//! - the attempt itself, whose result is always delivered once it has started

use crate::domain::{DomainError, PlatformError};
use crate::ports::{JoinBackend, ProviderResult};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

struct JoinRequest {
    identifier: String,
    /// Fired when the attempt begins. Fails if the caller already gave up.
    started: oneshot::Sender<()>,
    reply: oneshot::Sender<ProviderResult>,
}

/// Session worker. Consumes the request channel until every handle is dropped.
pub struct SessionWorker {
    backend: Box<dyn JoinBackend>,
    rx: mpsc::Receiver<JoinRequest>,
    attempt_timeout: Duration,
}

/// Cloneable front of the worker's queue. Implements [`JoinBackend`] by forwarding.
#[derive(Clone)]
pub struct SessionQueue {
    tx: mpsc::Sender<JoinRequest>,
    queue_timeout: Duration,
}

impl SessionWorker {
    /// Build the worker and its queue. `capacity` bounds waiting requests; senders
    /// wait when it is full. `timeout` bounds the queue wait and the attempt separately.
    pub fn new(
        backend: Box<dyn JoinBackend>,
        capacity: usize,
        timeout: Duration,
    ) -> (Self, SessionQueue) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                backend,
                rx,
                attempt_timeout: timeout,
            },
            SessionQueue {
                tx,
                queue_timeout: timeout,
            },
        )
    }

    /// Spawn the worker on the runtime and return its queue.
    pub fn spawn(backend: Box<dyn JoinBackend>, capacity: usize, timeout: Duration) -> SessionQueue {
        let (worker, queue) = Self::new(backend, capacity, timeout);
        tokio::spawn(worker.run());
        queue
    }

    pub async fn run(mut self) {
        while let Some(req) = self.rx.recv().await {
            if req.started.send(()).is_err() {
                debug!(identifier = %req.identifier, "skipping abandoned join request");
                continue;
            }
            let result =
                match tokio::time::timeout(self.attempt_timeout, self.backend.attempt(&req.identifier))
                    .await
                {
                    Ok(r) => r,
                    Err(_) => {
                        warn!(identifier = %req.identifier, "delegated join timed out");
                        Err(PlatformError::Timeout.into())
                    }
                };
            if req.reply.send(result).is_err() {
                warn!(identifier = %req.identifier, "join caller went away before the result");
            }
        }
        info!("session worker finished (queue closed)");
    }
}

fn worker_gone() -> DomainError {
    DomainError::Session("session worker stopped".into())
}

#[async_trait::async_trait]
impl JoinBackend for SessionQueue {
    async fn attempt(&self, identifier: &str) -> ProviderResult {
        let (started_tx, mut started) = oneshot::channel();
        let (reply, result) = oneshot::channel();
        let request = JoinRequest {
            identifier: identifier.to_string(),
            started: started_tx,
            reply,
        };

        let queued = async {
            if self.tx.send(request).await.is_err() {
                return Err(worker_gone());
            }
            (&mut started).await.map_err(|_| worker_gone())
        };
        let waited = tokio::time::timeout(self.queue_timeout, queued).await;
        match waited {
            Ok(r) => r?,
            Err(_) => {
                // Close before looking, so a start that raced the deadline is seen here
                // and the worker cannot start after we return.
                started.close();
                if started.try_recv().is_err() {
                    debug!(identifier, "join request timed out in queue");
                    return Err(PlatformError::Timeout.into());
                }
            }
        }

        result.await.map_err(|_| worker_gone())?
    }
}
