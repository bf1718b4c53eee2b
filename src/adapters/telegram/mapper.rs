//! Map grammers types to domain entities.
//!
//! Extracts ResolvedChat from tl chats/updates and flattens InvocationError into PlatformError.

use crate::domain::{ChatType, PlatformError, ResolvedChat};
use grammers_client::InvocationError;
use grammers_client::tl;

/// Offset the Bot API adds to channel and supergroup ids (`-100…` prefix).
const CHANNEL_ID_OFFSET: i64 = 1_000_000_000_000;

/// Fallback when the server sends FLOOD_WAIT without a value.
const DEFAULT_FLOOD_WAIT_SECS: u64 = 60;

/// Bot-API dialog id of a basic group.
pub fn group_dialog_id(raw_id: i64) -> i64 {
    -raw_id
}

/// Bot-API dialog id of a channel or supergroup.
pub fn channel_dialog_id(raw_id: i64) -> i64 {
    -(CHANNEL_ID_OFFSET + raw_id)
}

/// Map a tl chat to domain metadata.
///
/// * `Chat::Chat` → Group.
/// * `Chat::Channel` → Supergroup when megagroup, Channel otherwise.
/// * Empty and forbidden chats carry nothing usable → None.
pub fn chat_from_tl(chat: &tl::enums::Chat) -> Option<ResolvedChat> {
    match chat {
        tl::enums::Chat::Chat(c) => Some(ResolvedChat {
            id: group_dialog_id(c.id),
            title: c.title.clone(),
            chat_type: ChatType::Group,
            member_count: Some(c.participants_count),
            username: None,
        }),
        tl::enums::Chat::Channel(c) => Some(ResolvedChat {
            id: channel_dialog_id(c.id),
            title: c.title.clone(),
            chat_type: if c.megagroup {
                ChatType::Supergroup
            } else {
                ChatType::Channel
            },
            member_count: c.participants_count,
            username: c.username.clone(),
        }),
        _ => None,
    }
}

/// First usable chat carried by an `Updates` answer (ImportChatInvite returns one).
pub fn chat_from_updates(updates: &tl::enums::Updates) -> Option<ResolvedChat> {
    let chats = match updates {
        tl::enums::Updates::Updates(u) => &u.chats,
        tl::enums::Updates::Combined(u) => &u.chats,
        _ => return None,
    };
    chats.iter().find_map(chat_from_tl)
}

/// Chat behind a CheckChatInvite answer. `Invite` means we are not in it: no id to report.
pub fn chat_from_invite(invite: &tl::enums::ChatInvite) -> Option<ResolvedChat> {
    match invite {
        tl::enums::ChatInvite::Already(a) => chat_from_tl(&a.chat),
        tl::enums::ChatInvite::Peek(p) => chat_from_tl(&p.chat),
        tl::enums::ChatInvite::Invite(_) => None,
    }
}

pub fn platform_error(e: &InvocationError) -> PlatformError {
    match e {
        InvocationError::Rpc(rpc) => platform_error_from_rpc(rpc.code, &rpc.name, rpc.value),
        other => PlatformError::Unknown(other.to_string()),
    }
}

/// Canonical translation of an RPC error. Names are matched before codes.
pub fn platform_error_from_rpc(code: i32, name: &str, value: Option<u32>) -> PlatformError {
    match name {
        "USER_ALREADY_PARTICIPANT" => PlatformError::AlreadyMember,
        "INVITE_HASH_EXPIRED" => PlatformError::Expired,
        "INVITE_HASH_INVALID" | "INVITE_HASH_EMPTY" => PlatformError::Invalid,
        "FLOOD_WAIT" | "FLOOD_PREMIUM_WAIT" | "SLOWMODE_WAIT" => PlatformError::RateLimited {
            retry_after_secs: value.map(u64::from).unwrap_or(DEFAULT_FLOOD_WAIT_SECS),
        },
        "CHANNEL_PRIVATE" | "CHANNELS_TOO_MUCH" | "USERS_TOO_MUCH" | "USER_BANNED_IN_CHANNEL" => {
            PlatformError::Forbidden
        }
        "USERNAME_NOT_OCCUPIED" | "USERNAME_INVALID" | "CHANNEL_INVALID" | "PEER_ID_INVALID" => {
            PlatformError::NotFound
        }
        _ => match code {
            420 => PlatformError::RateLimited {
                retry_after_secs: value.map(u64::from).unwrap_or(DEFAULT_FLOOD_WAIT_SECS),
            },
            403 => PlatformError::Forbidden,
            _ => PlatformError::Unknown(format!("{} ({})", name, code)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dialog_ids() {
        assert_eq!(group_dialog_id(4242), -4242);
        assert_eq!(channel_dialog_id(1234567890), -1001234567890);
    }

    #[test]
    fn test_invite_errors() {
        assert_eq!(
            platform_error_from_rpc(400, "INVITE_HASH_EXPIRED", None),
            PlatformError::Expired
        );
        assert_eq!(
            platform_error_from_rpc(400, "INVITE_HASH_INVALID", None),
            PlatformError::Invalid
        );
        assert_eq!(
            platform_error_from_rpc(400, "USER_ALREADY_PARTICIPANT", None),
            PlatformError::AlreadyMember
        );
    }

    #[test]
    fn test_flood_wait() {
        assert_eq!(
            platform_error_from_rpc(420, "FLOOD_WAIT", Some(31)),
            PlatformError::RateLimited {
                retry_after_secs: 31
            }
        );
        assert_eq!(
            platform_error_from_rpc(420, "SOMETHING_NEW", None),
            PlatformError::RateLimited {
                retry_after_secs: DEFAULT_FLOOD_WAIT_SECS
            }
        );
    }

    #[test]
    fn test_fallbacks() {
        assert_eq!(
            platform_error_from_rpc(403, "CHAT_WRITE_FORBIDDEN", None),
            PlatformError::Forbidden
        );
        assert_eq!(
            platform_error_from_rpc(400, "CHANNEL_PRIVATE", None),
            PlatformError::Forbidden
        );
        assert_eq!(
            platform_error_from_rpc(500, "INTERNAL", None),
            PlatformError::Unknown("INTERNAL (500)".into())
        );
    }
}
