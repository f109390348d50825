use crate::domain::entities::Inbox;
use crate::domain::errors::DomainResult;

#[async_trait::async_trait]
pub trait InboxRepository: Send + Sync {
    async fn get_inbox_by_id(&self, id: &str) -> DomainResult<Option<Inbox>>;
}
