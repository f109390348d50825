use crate::domain::entities::Conversation;
use crate::domain::errors::DomainResult;
use async_trait::async_trait;

/// An automated reply (greeting, contact info request, out-of-office notice).
/// Rendering and delivering the template content is up to the implementor.
#[async_trait]
pub trait AutomatedResponse: Send + Sync {
    /// Returns whether a response was actually produced.
    async fn apply(&self, conversation: &Conversation) -> DomainResult<bool>;
}
