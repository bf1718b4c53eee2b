//! Implements ServiceIdentityPort and MessageSender over the Bot API (teloxide).

use crate::adapters::bot::mapper;
use crate::domain::{PlatformError, ResolvedChat};
use crate::ports::{MessageSender, ServiceIdentityPort};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;
use teloxide::prelude::*;
use teloxide::types::Recipient;
use tracing::{debug, info};

/// HTTP timeout. Must exceed the long-polling timeout so getUpdates is not cut short.
const HTTP_TIMEOUT: Duration = Duration::from_secs(45);

/// The bot account. Cheap to clone; teloxide's Bot is an Arc inside.
#[derive(Clone)]
pub struct TeloxideServiceIdentity {
    bot: Bot,
    me: UserId,
    username: Option<String>,
}

impl TeloxideServiceIdentity {
    /// Build the client and verify the token with getMe.
    pub async fn connect(token: &SecretString) -> anyhow::Result<Self> {
        let client = teloxide::net::default_reqwest_settings()
            .timeout(HTTP_TIMEOUT)
            .build()?;
        let bot = Bot::with_client(token.expose_secret(), client);
        let me = bot.get_me().await?;
        info!(bot_id = me.id.0, username = ?me.username, "bot connected");
        Ok(Self {
            me: me.id,
            username: me.username.clone(),
            bot,
        })
    }

    pub fn bot(&self) -> &Bot {
        &self.bot
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }
}

#[async_trait]
impl ServiceIdentityPort for TeloxideServiceIdentity {
    async fn lookup_chat(&self, handle: &str) -> Result<ResolvedChat, PlatformError> {
        let recipient = Recipient::ChannelUsername(format!("@{}", handle));
        let chat = self
            .bot
            .get_chat(recipient)
            .await
            .map_err(|e| mapper::platform_error(&e))?;
        let member_count = match self.bot.get_chat_member_count(chat.id).await {
            Ok(n) => i32::try_from(n).ok(),
            Err(e) => {
                debug!(chat_id = chat.id.0, error = %e, "member count unavailable");
                None
            }
        };
        mapper::chat_from_api(&chat, member_count).ok_or(PlatformError::NotFound)
    }

    async fn is_self_member(&self, chat_id: i64) -> Result<bool, PlatformError> {
        let member = self
            .bot
            .get_chat_member(ChatId(chat_id), self.me)
            .await
            .map_err(|e| mapper::platform_error(&e))?;
        Ok(member.kind.is_present())
    }
}

#[async_trait]
impl MessageSender for TeloxideServiceIdentity {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PlatformError> {
        self.bot
            .send_message(ChatId(chat_id), text)
            .await
            .map(|_| ())
            .map_err(|e| mapper::platform_error(&e))
    }
}
