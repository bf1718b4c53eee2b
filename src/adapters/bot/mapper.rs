//! Map teloxide types to domain entities.

use crate::domain::{ChatType, PlatformError, ResolvedChat};
use teloxide::types::Chat;
use teloxide::{ApiError, RequestError};

/// Flatten a Bot API failure into the canonical platform error.
pub fn platform_error(e: &RequestError) -> PlatformError {
    match e {
        RequestError::RetryAfter(wait) => PlatformError::RateLimited {
            retry_after_secs: wait.duration().as_secs(),
        },
        RequestError::Api(api) => api_error(api),
        RequestError::Network(net) if net.is_timeout() => PlatformError::Timeout,
        other => PlatformError::Unknown(other.to_string()),
    }
}

fn api_error(e: &ApiError) -> PlatformError {
    match e {
        ApiError::ChatNotFound | ApiError::UserNotFound => PlatformError::NotFound,
        ApiError::BotBlocked
        | ApiError::BotKicked
        | ApiError::BotKickedFromSupergroup
        | ApiError::NotEnoughRightsToPostMessages
        | ApiError::CantInitiateConversation
        | ApiError::UserDeactivated => PlatformError::Forbidden,
        other => PlatformError::Unknown(other.to_string()),
    }
}

/// Domain metadata for a chat fetched with getChat. Private chats are not joinable targets.
pub fn chat_from_api(chat: &Chat, member_count: Option<i32>) -> Option<ResolvedChat> {
    let chat_type = if chat.is_channel() {
        ChatType::Channel
    } else if chat.is_supergroup() {
        ChatType::Supergroup
    } else if chat.is_group() {
        ChatType::Group
    } else {
        return None;
    };
    Some(ResolvedChat {
        id: chat.id.0,
        title: chat.title().unwrap_or_default().to_string(),
        chat_type,
        member_count,
        username: chat.username().map(String::from),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_after_is_rate_limited() {
        let err = RequestError::RetryAfter(teloxide::types::Seconds::from_seconds(42));
        assert_eq!(
            platform_error(&err),
            PlatformError::RateLimited {
                retry_after_secs: 42
            }
        );
    }

    #[test]
    fn test_api_errors() {
        assert_eq!(
            platform_error(&RequestError::Api(ApiError::ChatNotFound)),
            PlatformError::NotFound
        );
        assert_eq!(
            platform_error(&RequestError::Api(ApiError::BotKicked)),
            PlatformError::Forbidden
        );
        assert!(matches!(
            platform_error(&RequestError::Api(ApiError::Unknown("weird".into()))),
            PlatformError::Unknown(_)
        ));
    }

    #[test]
    fn test_io_error_is_unknown() {
        let err = RequestError::Io(std::io::Error::other("boom"));
        assert!(matches!(platform_error(&err), PlatformError::Unknown(_)));
    }
}
