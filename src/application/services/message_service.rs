use std::sync::Arc;

use crate::application::dispatcher::EventDispatcher;
use crate::domain::entities::{Message, NewMessage};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{Clock, ConversationRepository};
use crate::domain::services::state_machine::{self, TransitionContext};

#[derive(Clone)]
pub struct MessageService {
    conversation_repo: Arc<dyn ConversationRepository>,
    dispatcher: Arc<EventDispatcher>,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepository>,
        dispatcher: Arc<EventDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conversation_repo,
            dispatcher,
            clock,
        }
    }

    /// Append a message to its conversation, update the reply window and
    /// dispatch `message.created` plus any reply or status events.
    #[tracing::instrument(skip(self, new), fields(conversation_id = %new.conversation_id, message_type = %new.message_type))]
    pub async fn create_message(&self, new: NewMessage) -> DomainResult<Message> {
        Message::validate_content(&new.content).map_err(DomainError::ValidationError)?;

        let mut conversation = self
            .conversation_repo
            .get_conversation_by_id(&new.conversation_id)
            .await?
            .ok_or_else(|| {
                DomainError::NotFound(format!("Conversation {}", new.conversation_id))
            })?;

        let now = self.clock.now();
        let performed_by = new.sender_id.clone();
        let message = Message::build(new, &conversation.account_id, &conversation.inbox_id, now);

        let ctx = TransitionContext { performed_by, now };
        let events = state_machine::record_message(&mut conversation, &message, &ctx);

        self.conversation_repo.save_conversation(&conversation).await?;
        tracing::info!(
            "Created {} message {} in conversation {}",
            message.message_type,
            message.id,
            conversation.id
        );

        self.dispatcher.dispatch_all(&events).await;
        Ok(message)
    }

    pub async fn list_messages(&self, conversation_id: &str) -> DomainResult<Vec<Message>> {
        let conversation = self
            .conversation_repo
            .get_conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Conversation {}", conversation_id)))?;
        Ok(conversation.messages)
    }
}
