//! Inbound port. UI (adapter) calls into the application.

use crate::domain::DomainError;

/// Input port: the chat front-end drives the application use cases.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    /// Gate access (if configured), then run the chat loop until the user quits.
    async fn run(&self) -> Result<(), DomainError>;
}
