//! Implements InputPort. Manual getUpdates long polling.
//!
//! Each message is handled on its own task so a long broadcast does not stall polling.

use crate::adapters::bot::handler::CommandHandler;
use crate::domain::DomainError;
use crate::ports::InputPort;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::{AllowedUpdate, UpdateKind};
use teloxide::{ApiError, RequestError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Long-poll timeout in seconds.
const POLL_TIMEOUT_SECS: u32 = 30;
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

pub struct BotInputPort {
    bot: Bot,
    handler: Arc<CommandHandler>,
    cancel: CancellationToken,
}

impl BotInputPort {
    pub fn new(bot: Bot, handler: Arc<CommandHandler>, cancel: CancellationToken) -> Self {
        Self {
            bot,
            handler,
            cancel,
        }
    }
}

#[async_trait]
impl InputPort for BotInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        // Long polling does not work while a webhook is set.
        if let Err(e) = self.bot.delete_webhook().send().await {
            warn!(error = %e, "could not clear webhook");
        }
        info!("bot polling started");

        let mut offset: i32 = 0;
        loop {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => break,
                r = self
                    .bot
                    .get_updates()
                    .offset(offset)
                    .timeout(POLL_TIMEOUT_SECS)
                    .allowed_updates(vec![AllowedUpdate::Message])
                    .send() => r,
            };

            match result {
                Ok(updates) => {
                    for update in updates {
                        offset = update.id.as_offset();
                        let UpdateKind::Message(msg) = update.kind else {
                            debug!("ignoring non-message update");
                            continue;
                        };
                        let (Some(from), Some(text)) = (msg.from.as_ref(), msg.text()) else {
                            continue;
                        };
                        let user_id = from.id.0 as i64;
                        let chat_id = msg.chat.id.0;
                        let text = text.to_string();
                        let handler = Arc::clone(&self.handler);
                        tokio::spawn(async move {
                            handler.handle(chat_id, user_id, &text).await;
                        });
                    }
                }
                Err(RequestError::Api(ApiError::TerminatedByOtherGetUpdates)) => {
                    return Err(DomainError::Capability(
                        "another instance is polling with this bot token".into(),
                    ));
                }
                Err(RequestError::Api(ApiError::InvalidToken)) => {
                    return Err(DomainError::Auth("bot token rejected".into()));
                }
                Err(e) => {
                    warn!(error = %e, "getUpdates failed");
                    tokio::select! {
                        _ = self.cancel.cancelled() => break,
                        _ = tokio::time::sleep(ERROR_BACKOFF) => {}
                    }
                }
            }
        }
        info!("bot polling stopped");
        Ok(())
    }
}
