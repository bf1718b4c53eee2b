//! Service identity over the Bot API (teloxide): chat lookup, sends, and the command front-end.

pub mod client;
pub mod commands;
pub mod handler;
pub mod mapper;
pub mod poller;

pub use client::TeloxideServiceIdentity;
pub use handler::CommandHandler;
pub use poller::BotInputPort;
