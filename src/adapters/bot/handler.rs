//! Routes one incoming text message to the use cases and replies in the same chat.
//!
//! Every command requires an authorized sender. Plain text from a locked sender is
//! treated as an access-code attempt.

use crate::adapters::bot::commands::{self, Command};
use crate::domain::DomainError;
use crate::domain::invite::classify;
use crate::ports::{ChatRegistryPort, MessageSender};
use crate::usecases::{AccessGate, BroadcastDispatcher, JoinOrchestrator, preview};
use crate::usecases::broadcast::PREVIEW_CHARS;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub struct CommandHandler {
    gate: Arc<AccessGate>,
    orchestrator: Arc<JoinOrchestrator>,
    dispatcher: Arc<BroadcastDispatcher>,
    registry: Arc<dyn ChatRegistryPort>,
    replies: Arc<dyn MessageSender>,
    bot_username: Option<String>,
    cancel: CancellationToken,
}

impl CommandHandler {
    pub fn new(
        gate: Arc<AccessGate>,
        orchestrator: Arc<JoinOrchestrator>,
        dispatcher: Arc<BroadcastDispatcher>,
        registry: Arc<dyn ChatRegistryPort>,
        replies: Arc<dyn MessageSender>,
        bot_username: Option<String>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            gate,
            orchestrator,
            dispatcher,
            registry,
            replies,
            bot_username,
            cancel,
        }
    }

    pub async fn handle(&self, chat_id: i64, user_id: i64, text: &str) {
        let command = commands::parse(text, self.bot_username.as_deref());

        if !self.gate.is_authorized(user_id).await {
            match command {
                None => match self.gate.verify_code(user_id, text).await {
                    Ok(true) => self.reply(chat_id, commands::UNLOCKED_TEXT).await,
                    Ok(false) => self.reply(chat_id, commands::LOCKED_TEXT).await,
                    Err(e) => {
                        error!(user_id, error = %e, "could not save access list");
                        self.reply(chat_id, "⚠️ Access code accepted but could not be saved. Try again.")
                            .await;
                    }
                },
                Some(_) => {
                    info!(user_id, "command from locked user refused");
                    self.reply(chat_id, commands::LOCKED_TEXT).await;
                }
            }
            return;
        }

        let Some(command) = command else {
            debug!(user_id, "ignoring plain text from authorized user");
            return;
        };

        if let Err(e) = self.run(chat_id, user_id, command).await {
            error!(user_id, error = %e, "command failed");
            self.reply(chat_id, &format!("⚠️ {}", e)).await;
        }
    }

    async fn run(&self, chat_id: i64, user_id: i64, command: Command) -> Result<(), DomainError> {
        match command {
            Command::Start => self.reply(chat_id, &commands::start_text()).await,
            Command::Help => self.reply(chat_id, &commands::help_text()).await,
            Command::Join(raw) if raw.is_empty() => {
                self.reply(chat_id, commands::usage_join()).await
            }
            Command::Join(raw) => {
                let reference = match classify(&raw) {
                    Ok(r) => r,
                    Err(e) => {
                        info!(user_id, reference = %raw, reason = %e, "join refused: bad format");
                        self.reply(chat_id, &commands::format_error_text(&e)).await;
                        return Ok(());
                    }
                };
                info!(user_id, reference = %reference.normalized, "join requested");
                let result = self.orchestrator.join(&reference).await;
                let total = self.registry.list_all().await?.len();
                self.reply(chat_id, &commands::format_join(&result, total))
                    .await
            }
            Command::Broadcast(message) if message.is_empty() => {
                self.reply(chat_id, commands::usage_broadcast()).await
            }
            Command::Broadcast(message) => {
                let targets = self.registry.list_all().await?;
                if targets.is_empty() {
                    self.reply(chat_id, "No chats joined yet.").await;
                    return Ok(());
                }
                let short = preview(&message, PREVIEW_CHARS);
                info!(user_id, targets = targets.len(), preview = %short, "broadcast requested");
                self.reply(
                    chat_id,
                    &commands::format_broadcast_start(targets.len(), &short),
                )
                .await;
                let report = self.dispatcher.dispatch(&message, &targets, &self.cancel).await;
                self.reply(chat_id, &commands::format_report(&report)).await
            }
            Command::List => {
                let records = self.registry.list_all().await?;
                for chunk in commands::format_list(&records) {
                    self.reply(chat_id, &chunk).await;
                }
            }
            Command::Unknown(name) => {
                self.reply(chat_id, &format!("Unknown command /{}. Send /help.", name))
                    .await
            }
        }
        Ok(())
    }

    async fn reply(&self, chat_id: i64, text: &str) {
        if let Err(e) = self.replies.send_text(chat_id, text).await {
            warn!(chat_id, error = %e, "reply not delivered");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::persistence::{AccessJson, RegistryJson};
    use crate::domain::{ChatType, PlatformError, ResolvedChat};
    use crate::ports::{JoinBackend, ProviderOutcome, ProviderResult};
    use secrecy::SecretString;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(i64, String)>>,
    }

    impl Outbox {
        fn texts_to(&self, chat_id: i64) -> Vec<String> {
            self.sent
                .lock()
                .unwrap()
                .iter()
                .filter(|(id, _)| *id == chat_id)
                .map(|(_, t)| t.clone())
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl MessageSender for Outbox {
        async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PlatformError> {
            self.sent.lock().unwrap().push((chat_id, text.to_string()));
            Ok(())
        }
    }

    struct JoinsEverything;

    #[async_trait::async_trait]
    impl JoinBackend for JoinsEverything {
        async fn attempt(&self, identifier: &str) -> ProviderResult {
            Ok(ProviderOutcome::Joined(ResolvedChat {
                id: -1009,
                title: format!("Chat {}", identifier),
                chat_type: ChatType::Supergroup,
                member_count: Some(3),
                username: None,
            }))
        }
    }

    const ADMIN_CHAT: i64 = 100;
    const ADMIN: i64 = 7;

    async fn handler(dir: &std::path::Path) -> (CommandHandler, Arc<Outbox>) {
        let outbox = Arc::new(Outbox::default());
        let registry = Arc::new(RegistryJson::new(dir.join("chat_registry.json")));
        registry.load().await.unwrap();
        let gate = AccessGate::load(
            Arc::new(AccessJson::new(dir.join("authorized_users.json"))),
            Some(SecretString::new("letmein".into())),
        )
        .await
        .unwrap();
        let orchestrator = JoinOrchestrator::new(
            Arc::new(JoinsEverything),
            Arc::new(JoinsEverything),
            Arc::clone(&registry) as Arc<dyn ChatRegistryPort>,
            Duration::from_secs(5),
        );
        let dispatcher = BroadcastDispatcher::new(
            Arc::clone(&outbox) as Arc<dyn MessageSender>,
            Arc::clone(&registry) as Arc<dyn ChatRegistryPort>,
            2,
            Duration::from_secs(5),
        );
        let h = CommandHandler::new(
            Arc::new(gate),
            Arc::new(orchestrator),
            Arc::new(dispatcher),
            registry,
            Arc::clone(&outbox) as Arc<dyn MessageSender>,
            Some("joinbot".into()),
            CancellationToken::new(),
        );
        (h, outbox)
    }

    #[tokio::test]
    async fn test_locked_until_code_sent() {
        let dir = tempfile::tempdir().unwrap();
        let (h, outbox) = handler(dir.path()).await;

        h.handle(ADMIN_CHAT, ADMIN, "/list").await;
        h.handle(ADMIN_CHAT, ADMIN, "wrong").await;
        h.handle(ADMIN_CHAT, ADMIN, "letmein").await;
        h.handle(ADMIN_CHAT, ADMIN, "/list").await;

        let texts = outbox.texts_to(ADMIN_CHAT);
        assert_eq!(texts[0], commands::LOCKED_TEXT);
        assert_eq!(texts[1], commands::LOCKED_TEXT);
        assert_eq!(texts[2], commands::UNLOCKED_TEXT);
        assert_eq!(texts[3], "No chats joined yet.");
    }

    #[tokio::test]
    async fn test_join_then_broadcast() {
        let dir = tempfile::tempdir().unwrap();
        let (h, outbox) = handler(dir.path()).await;
        h.handle(ADMIN_CHAT, ADMIN, "letmein").await;

        h.handle(ADMIN_CHAT, ADMIN, "/join https://t.me/+AbC").await;
        h.handle(ADMIN_CHAT, ADMIN, "/bc hello all").await;

        let texts = outbox.texts_to(ADMIN_CHAT);
        assert!(texts[1].contains("Title: Chat AbC"));
        assert!(texts[1].contains("Stored chats: 1"));
        assert!(texts[2].starts_with("📣 Broadcasting to 1 chats"));
        assert!(texts[3].contains("Success: 1\nFailed: 0\nTotal: 1"));
        assert_eq!(outbox.texts_to(-1009), vec!["hello all".to_string()]);
    }

    #[tokio::test]
    async fn test_bad_link_and_usage() {
        let dir = tempfile::tempdir().unwrap();
        let (h, outbox) = handler(dir.path()).await;
        h.handle(ADMIN_CHAT, ADMIN, "letmein").await;

        h.handle(ADMIN_CHAT, ADMIN, "/join not a link").await;
        h.handle(ADMIN_CHAT, ADMIN, "/join").await;
        h.handle(ADMIN_CHAT, ADMIN, "/bc   ").await;

        let texts = outbox.texts_to(ADMIN_CHAT);
        assert!(texts[1].starts_with("❌ Invalid link"));
        assert_eq!(texts[2], commands::usage_join());
        assert_eq!(texts[3], commands::usage_broadcast());
    }
}
