use crate::domain::errors::DomainResult;
use crate::domain::events::{DomainEvent, EventName};
use async_trait::async_trait;

/// Consumer of dispatched domain events.
///
/// A returned error is logged by the dispatcher and does not reach the
/// caller or the other listeners. Panics are not caught.
#[async_trait]
pub trait EventListener: Send + Sync {
    async fn handle(&self, event: &DomainEvent) -> DomainResult<()>;

    /// Listener name for logs and metric labels.
    fn name(&self) -> &'static str;

    /// Events this listener wants when registered through `EventDispatcher::register`.
    fn subscriptions(&self) -> &'static [EventName];
}
