//! Domain entities. Pure data structures for the core business.
//!
//! No Telegram/IO types here; adapters map into these.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::domain::errors::PlatformError;

/// Kind of chat the bot can be a member of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatType {
    Group,
    Supergroup,
    Channel,
}

impl fmt::Display for ChatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChatType::Group => "Group",
            ChatType::Supergroup => "Supergroup",
            ChatType::Channel => "Channel",
        })
    }
}

/// How an invite reference must be joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LinkKind {
    /// `@handle`, `t.me/handle`: public chat, resolved by the bot.
    PublicHandle,
    /// `t.me/+HASH`, `t.me/joinchat/HASH`: private invite, imported by the user session.
    PrivateHash,
}

/// A classified invite reference. Built only by [`crate::domain::invite::classify`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteReference {
    pub raw: String,
    /// Absolute `https://` form.
    pub normalized: String,
    pub kind: LinkKind,
    /// Invite hash for [`LinkKind::PrivateHash`], handle (without `@`) otherwise.
    pub identifier: String,
}

/// Chat metadata as reported by a join backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedChat {
    /// Bot-API dialog id (`-100…` for channels/supergroups, negative for basic groups).
    pub id: i64,
    pub title: String,
    pub chat_type: ChatType,
    pub member_count: Option<i32>,
    pub username: Option<String>,
}

/// A chat the bot has joined. Owned by the chat registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: i64,
    pub title: String,
    #[serde(rename = "type")]
    pub chat_type: ChatType,
    pub origin_reference: Option<String>,
    pub joined_at: DateTime<Utc>,
    pub last_broadcast_at: Option<DateTime<Utc>>,
}

impl ChatRecord {
    /// Fresh record for a chat first seen at `joined_at`.
    pub fn from_resolved(
        chat: &ResolvedChat,
        origin: Option<&str>,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: chat.id,
            title: chat.title.clone(),
            chat_type: chat.chat_type,
            origin_reference: origin.map(String::from),
            joined_at,
            last_broadcast_at: None,
        }
    }
}

/// Why a join was refused. Terminal; retrying the same reference will not help.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    ManualAdditionRequired,
    ChatNotFound,
    Expired,
    Invalid,
    Forbidden,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RejectReason::ManualAdditionRequired => "manual-addition-required",
            RejectReason::ChatNotFound => "chat-not-found",
            RejectReason::Expired => "expired",
            RejectReason::Invalid => "invalid",
            RejectReason::Forbidden => "forbidden",
        })
    }
}

/// Why a join could not be completed. May succeed later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailReason {
    SessionUnavailable,
    RateLimited { retry_after_secs: u64 },
    Timeout,
    Unknown(String),
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailReason::SessionUnavailable => f.write_str("session-unavailable"),
            FailReason::RateLimited { .. } => f.write_str("rate-limited"),
            FailReason::Timeout => f.write_str("timeout"),
            FailReason::Unknown(_) => f.write_str("unknown"),
        }
    }
}

/// Terminal state of a join attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    AlreadyMember,
    /// Joined on the platform but the registry write failed.
    PartialSuccess { storage_error: String },
    Rejected(RejectReason),
    Failed(FailReason),
}

impl JoinOutcome {
    /// True when the bot ended up in the chat, whether or not it was recorded.
    pub fn is_member(&self) -> bool {
        matches!(
            self,
            JoinOutcome::Joined | JoinOutcome::AlreadyMember | JoinOutcome::PartialSuccess { .. }
        )
    }
}

/// Result of one `join` call. Always produced, whatever happens on the way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinAttemptResult {
    pub reference: InviteReference,
    pub outcome: JoinOutcome,
    pub chat: Option<ChatRecord>,
    pub member_count: Option<i32>,
}

/// Why a single broadcast target failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    Platform(PlatformError),
    Cancelled,
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendFailure::Platform(e) => write!(f, "{}", e),
            SendFailure::Cancelled => f.write_str("cancelled"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BroadcastFailure {
    pub chat_id: i64,
    pub reason: SendFailure,
}

/// Outcome of one broadcast. `failures` keeps target order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub total: usize,
    pub success: usize,
    pub failures: Vec<BroadcastFailure>,
    /// Truncated message, for logs and replies.
    pub preview: String,
}

impl BroadcastReport {
    pub fn failed(&self) -> usize {
        self.failures.len()
    }
}
