//! Port traits. API boundaries for the hexagon.
//!
//! - Inbound: Called by front-ends into the application
//! - Outbound: Called by application into infrastructure

pub mod inbound;
pub mod outbound;

pub use inbound::InputPort;
pub use outbound::{
    AccessStorePort, AuthPort, ChatRegistryPort, JoinBackend, LoginRejection, MessageSender,
    ProviderOutcome, ProviderResult, ServiceIdentityPort, SessionProvider, SignInResult,
};
