use crate::domain::entities::Conversation;
use crate::domain::errors::DomainResult;

/// Record store for conversations. Callers serialize writes per conversation.
#[async_trait::async_trait]
pub trait ConversationRepository: Send + Sync {
    /// Insert a new conversation. The returned copy carries the store-assigned
    /// `display_id`, which is not known before the insert completes.
    async fn create_conversation(&self, conversation: &Conversation) -> DomainResult<Conversation>;

    async fn get_conversation_by_id(&self, id: &str) -> DomainResult<Option<Conversation>>;

    async fn save_conversation(&self, conversation: &Conversation) -> DomainResult<()>;
}
