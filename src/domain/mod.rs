//! Core domain layer. No external I/O dependencies.
//!
//! Entities, invite classification, and error taxonomy live here. Dependencies flow inward.

pub mod entities;
pub mod errors;
pub mod invite;

pub use entities::{
    BroadcastFailure, BroadcastReport, ChatRecord, ChatType, FailReason, InviteReference,
    JoinAttemptResult, JoinOutcome, LinkKind, RejectReason, ResolvedChat, SendFailure,
};
pub use errors::{DomainError, FormatError, PlatformError};
