//! Inbound port. Front-ends (bot commands, terminal) call into the application.

use crate::domain::DomainError;

/// Input port: a front-end that receives requests and invokes use cases.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    /// Serve requests until stopped.
    async fn run(&self) -> Result<(), DomainError>;
}
