//! Outbound ports. Application calls into infrastructure.
//!
//! Implemented by adapters.

use crate::domain::{ChatRecord, DomainError, PlatformError, ResolvedChat};
use chrono::{DateTime, Utc};

/// Chat registry. Durable store of joined chats, keyed by chat id.
///
/// Every mutating call persists before returning. On error nothing changed.
#[async_trait::async_trait]
pub trait ChatRegistryPort: Send + Sync {
    /// Insert, or update title/type of an existing id. `joined_at`, origin and
    /// `last_broadcast_at` of an existing record are kept.
    async fn upsert(&self, record: ChatRecord) -> Result<(), DomainError>;

    /// Remove a chat. Returns false if the id was unknown.
    async fn remove(&self, chat_id: i64) -> Result<bool, DomainError>;

    /// Snapshot of all records, ordered by id.
    async fn list_all(&self) -> Result<Vec<ChatRecord>, DomainError>;

    /// One record by id.
    async fn get(&self, chat_id: i64) -> Result<Option<ChatRecord>, DomainError>;

    async fn exists(&self, chat_id: i64) -> Result<bool, DomainError>;

    /// Set `last_broadcast_at`. Unknown ids are ignored.
    async fn mark_broadcast(&self, chat_id: i64, at: DateTime<Utc>) -> Result<(), DomainError>;
}

/// What a join backend reports on success.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderOutcome {
    Joined(ResolvedChat),
    /// Already in the chat. Metadata is `None` when it could not be resolved.
    AlreadyMember(Option<ResolvedChat>),
}

pub type ProviderResult = Result<ProviderOutcome, DomainError>;

/// One way of getting into a chat, given the identifier extracted from an invite reference.
#[async_trait::async_trait]
pub trait JoinBackend: Send + Sync {
    async fn attempt(&self, identifier: &str) -> ProviderResult;
}

/// Delegated end-user session (MTProto). Only used behind the session worker.
#[async_trait::async_trait]
pub trait SessionProvider: Send + Sync {
    /// Credentials present. No network.
    fn is_configured(&self) -> bool;

    async fn is_authorized(&self) -> Result<bool, DomainError>;

    /// Import a private invite hash.
    async fn join(&self, invite_hash: &str) -> Result<ProviderOutcome, PlatformError>;
}

/// Service identity (bot) capabilities needed for public chats and broadcast.
#[async_trait::async_trait]
pub trait ServiceIdentityPort: Send + Sync {
    /// Resolve a public chat by handle (without `@`).
    async fn lookup_chat(&self, handle: &str) -> Result<ResolvedChat, PlatformError>;

    /// Whether the bot itself is currently present in the chat.
    async fn is_self_member(&self, chat_id: i64) -> Result<bool, PlatformError>;
}

/// Delivers one text message to one chat.
#[async_trait::async_trait]
pub trait MessageSender: Send + Sync {
    async fn send_text(&self, chat_id: i64, text: &str) -> Result<(), PlatformError>;
}

/// Why the platform turned a login step down. Not a transport error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginRejection {
    /// Wrong or expired code. The same login token accepts another code.
    InvalidCode,
    /// Wrong two-factor password. Needs a fresh code.
    InvalidPassword,
    /// No account for the phone.
    SignUpRequired,
}

impl std::fmt::Display for LoginRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            LoginRejection::InvalidCode => "invalid login code",
            LoginRejection::InvalidPassword => "wrong two-factor password",
            LoginRejection::SignUpRequired => {
                "no account for this phone; sign up with an official app first"
            }
        })
    }
}

/// Result of a login step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignInResult {
    Success,
    PasswordRequired { hint: Option<String> },
    Rejected(LoginRejection),
}

/// Login ceremony for the delegated session.
#[async_trait::async_trait]
pub trait AuthPort: Send + Sync {
    async fn is_authenticated(&self) -> Result<bool, DomainError>;

    async fn request_login_code(&self, phone: &str, api_hash: &str) -> Result<(), DomainError>;

    async fn sign_in(&self, code: &str) -> Result<SignInResult, DomainError>;

    /// `Success` or `Rejected(InvalidPassword)`.
    async fn check_password(&self, password: &[u8]) -> Result<SignInResult, DomainError>;
}

/// Persisted set of user ids allowed to command the bot.
#[async_trait::async_trait]
pub trait AccessStorePort: Send + Sync {
    async fn load_ids(&self) -> Result<Vec<i64>, DomainError>;

    async fn save_ids(&self, ids: &[i64]) -> Result<(), DomainError>;
}
