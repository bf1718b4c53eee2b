//! Broadcast fan-out: send one message to every registered chat.
//!
//! - Each target runs on its own task; a failure never touches other targets
//! - A semaphore bounds concurrent sends
//! - `mark_broadcast` only for targets that succeeded
//! - Cancellation marks in-flight and unstarted targets as cancelled
//! - No retries

use crate::domain::{
    BroadcastFailure, BroadcastReport, ChatRecord, DomainError, PlatformError, SendFailure,
};
use crate::ports::{ChatRegistryPort, MessageSender};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Characters of the message kept in previews.
pub const PREVIEW_CHARS: usize = 50;

/// Broadcast dispatcher. Reads targets from the registry at call time.
pub struct BroadcastDispatcher {
    sender: Arc<dyn MessageSender>,
    registry: Arc<dyn ChatRegistryPort>,
    concurrency: usize,
    send_timeout: Duration,
}

impl BroadcastDispatcher {
    pub fn new(
        sender: Arc<dyn MessageSender>,
        registry: Arc<dyn ChatRegistryPort>,
        concurrency: usize,
        send_timeout: Duration,
    ) -> Self {
        Self {
            sender,
            registry,
            concurrency: concurrency.max(1),
            send_timeout,
        }
    }

    /// Send `message` to all registered chats.
    pub async fn dispatch_all(
        &self,
        message: &str,
        cancel: &CancellationToken,
    ) -> Result<BroadcastReport, DomainError> {
        let targets = self.registry.list_all().await?;
        Ok(self.dispatch(message, &targets, cancel).await)
    }

    /// Send `message` to `targets`. Produces exactly one report.
    pub async fn dispatch(
        &self,
        message: &str,
        targets: &[ChatRecord],
        cancel: &CancellationToken,
    ) -> BroadcastReport {
        let preview = preview(message, PREVIEW_CHARS);
        info!(targets = targets.len(), preview = %preview, "broadcast starting");

        let message: Arc<str> = Arc::from(message);
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let mut set = JoinSet::new();

        for (idx, target) in targets.iter().enumerate() {
            let chat_id = target.id;
            let sender = Arc::clone(&self.sender);
            let registry = Arc::clone(&self.registry);
            let semaphore = Arc::clone(&semaphore);
            let message = Arc::clone(&message);
            let cancel = cancel.clone();
            let send_timeout = self.send_timeout;

            set.spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(SendFailure::Cancelled),
                    r = send_one(&*sender, &semaphore, chat_id, &message, send_timeout) => r,
                };
                if outcome.is_ok() {
                    if let Err(e) = registry.mark_broadcast(chat_id, Utc::now()).await {
                        warn!(chat_id, error = %e, "sent, but last-broadcast marker not saved");
                    }
                }
                (idx, outcome)
            });
        }

        let mut outcomes: Vec<Option<Result<(), SendFailure>>> = vec![None; targets.len()];
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, outcome)) => outcomes[idx] = Some(outcome),
                Err(e) => error!(error = %e, "broadcast send task failed"),
            }
        }

        let mut report = BroadcastReport {
            total: targets.len(),
            preview,
            ..Default::default()
        };
        for (target, outcome) in targets.iter().zip(outcomes) {
            match outcome {
                Some(Ok(())) => report.success += 1,
                Some(Err(reason)) => report.failures.push(BroadcastFailure {
                    chat_id: target.id,
                    reason,
                }),
                None => report.failures.push(BroadcastFailure {
                    chat_id: target.id,
                    reason: SendFailure::Platform(PlatformError::Unknown(
                        "send task aborted".into(),
                    )),
                }),
            }
        }

        log_report(&report);
        report
    }
}

async fn send_one(
    sender: &dyn MessageSender,
    semaphore: &Semaphore,
    chat_id: i64,
    message: &str,
    send_timeout: Duration,
) -> Result<(), SendFailure> {
    let Ok(_permit) = semaphore.acquire().await else {
        return Err(SendFailure::Cancelled);
    };
    match tokio::time::timeout(send_timeout, sender.send_text(chat_id, message)).await {
        Ok(Ok(())) => {
            debug!(chat_id, "broadcast delivered");
            Ok(())
        }
        Ok(Err(e)) => {
            warn!(chat_id, error = %e, "broadcast send failed");
            Err(SendFailure::Platform(e))
        }
        Err(_) => {
            warn!(chat_id, "broadcast send timed out");
            Err(SendFailure::Platform(PlatformError::Timeout))
        }
    }
}

fn log_report(report: &BroadcastReport) {
    let failed = report.failed();
    if failed == 0 {
        info!(success = report.success, total = report.total, preview = %report.preview, "broadcast complete");
    } else if report.success > 0 {
        warn!(success = report.success, failed, total = report.total, preview = %report.preview, "broadcast partially delivered");
    } else {
        error!(failed, total = report.total, preview = %report.preview, "broadcast failed");
    }
}

/// Truncate text for logs and status replies. Char-boundary safe.
pub fn preview(text: &str, max_chars: usize) -> String {
    let t = text.trim();
    match t.char_indices().nth(max_chars) {
        None => t.to_string(),
        Some((cut, _)) => format!("{}...", &t[..cut]),
    }
}
