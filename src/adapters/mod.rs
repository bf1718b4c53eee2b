//! Infrastructure adapters. Implement outbound ports.
//!
//! Bot API, MTProto session, JSON files, terminal. Map errors to DomainError.

pub mod bot;
pub mod persistence;
pub mod telegram;
pub mod ui;
