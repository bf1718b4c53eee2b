//! tg-autojoin: join Telegram groups/channels from invite links and broadcast to them,
//! with Hexagonal Architecture.
//!
//! Public chats go through the bot (service identity); private invite links through a
//! delegated user session that is driven by a single worker task.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod shared;
pub mod usecases;
