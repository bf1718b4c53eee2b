//! Domain errors. Used by ports and use cases.
//!
//! Adapters map infrastructure errors into these.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid invite reference: {0}")]
    Format(#[from] FormatError),

    /// Operation cannot be done by this identity at all (e.g. bot self-join to a public chat).
    #[error("Unsupported operation: {0}")]
    Capability(String),

    #[error("Delegated session error: {0}")]
    Session(String),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Authentication failed: {0}")]
    Auth(String),
}

/// Canonical platform failure. Every backend-native error ends up as one of these.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    #[error("already a member")]
    AlreadyMember,

    #[error("invite expired")]
    Expired,

    #[error("invite invalid")]
    Invalid,

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("forbidden")]
    Forbidden,

    #[error("not found")]
    NotFound,

    #[error("timeout")]
    Timeout,

    #[error("unknown: {0}")]
    Unknown(String),
}

/// Raw text did not match any supported invite form.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason}")]
pub struct FormatError {
    pub reason: String,
}

impl FormatError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}
