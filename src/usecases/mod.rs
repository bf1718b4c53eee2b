//! Application use cases. Orchestrate domain logic via ports.

pub mod access_gate;
pub mod auth_service;
pub mod broadcast;
pub mod delegated_joiner;
pub mod join_orchestrator;
pub mod service_joiner;
pub mod session_worker;

pub use access_gate::AccessGate;
pub use auth_service::{AuthService, AuthState};
pub use broadcast::{BroadcastDispatcher, preview};
pub use delegated_joiner::DelegatedIdentityJoiner;
pub use join_orchestrator::JoinOrchestrator;
pub use service_joiner::ServiceIdentityJoiner;
pub use session_worker::{SessionQueue, SessionWorker};
