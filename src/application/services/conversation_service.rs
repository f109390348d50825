use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::dispatcher::EventDispatcher;
use crate::domain::entities::{Conversation, CreateConversation, Priority};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::DomainEvent;
use crate::domain::ports::{Clock, ContactRepository, ConversationRepository, InboxRepository};
use crate::domain::services::state_machine::{self, TransitionContext};

/// Conversation lifecycle operations. Each one loads the conversation, runs the
/// transition, saves the result and only then dispatches the resulting events.
///
/// Callers must not run two operations on the same conversation concurrently.
#[derive(Clone)]
pub struct ConversationService {
    conversation_repo: Arc<dyn ConversationRepository>,
    inbox_repo: Arc<dyn InboxRepository>,
    contact_repo: Arc<dyn ContactRepository>,
    dispatcher: Arc<EventDispatcher>,
    clock: Arc<dyn Clock>,
}

impl ConversationService {
    pub fn new(
        conversation_repo: Arc<dyn ConversationRepository>,
        inbox_repo: Arc<dyn InboxRepository>,
        contact_repo: Arc<dyn ContactRepository>,
        dispatcher: Arc<EventDispatcher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            conversation_repo,
            inbox_repo,
            contact_repo,
            dispatcher,
            clock,
        }
    }

    #[tracing::instrument(skip(self, request), fields(inbox_id = %request.inbox_id))]
    pub async fn create_conversation(
        &self,
        request: CreateConversation,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        request.validate().map_err(DomainError::ValidationError)?;

        let inbox = self
            .inbox_repo
            .get_inbox_by_id(&request.inbox_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Inbox {}", request.inbox_id)))?;
        let contact = self
            .contact_repo
            .get_contact_by_id(&request.contact_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Contact {}", request.contact_id)))?;

        let now = self.clock.now();
        let conversation = state_machine::build_conversation(
            Uuid::new_v4().to_string(),
            request,
            &inbox,
            &contact,
            now,
        );

        // display_id only exists once the store has inserted the record
        let created = self.conversation_repo.create_conversation(&conversation).await?;
        tracing::info!(
            "Created conversation {} (#{:?}) with status {}",
            created.id,
            created.display_id,
            created.status
        );

        let ctx = TransitionContext {
            performed_by,
            now,
        };
        let events = state_machine::creation_events(&created, &ctx);
        self.dispatcher.dispatch_all(&events).await;
        Ok(created)
    }

    pub async fn get_conversation(&self, conversation_id: &str) -> DomainResult<Conversation> {
        self.conversation_repo
            .get_conversation_by_id(conversation_id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("Conversation {}", conversation_id)))
    }

    #[tracing::instrument(skip(self))]
    pub async fn toggle_status(
        &self,
        conversation_id: &str,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, state_machine::toggle_status)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn resolve(
        &self,
        conversation_id: &str,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, state_machine::resolve)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn reopen(
        &self,
        conversation_id: &str,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, state_machine::reopen)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn snooze(
        &self,
        conversation_id: &str,
        until: Option<DateTime<Utc>>,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        if let Some(until) = until {
            if until <= self.clock.now() {
                return Err(DomainError::ValidationError(
                    "Snooze time must be in the future".to_string(),
                ));
            }
        }
        self.transition(conversation_id, performed_by, |c, ctx| {
            state_machine::snooze(c, until, ctx)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn bot_handoff(
        &self,
        conversation_id: &str,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, state_machine::bot_handoff)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn assign_agent(
        &self,
        conversation_id: &str,
        assignee_id: Option<String>,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, |c, ctx| {
            state_machine::assign_agent(c, assignee_id, ctx)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn assign_team(
        &self,
        conversation_id: &str,
        team_id: Option<String>,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, |c, ctx| {
            state_machine::assign_team(c, team_id, ctx)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn toggle_priority(
        &self,
        conversation_id: &str,
        priority: Option<Priority>,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, |c, ctx| {
            state_machine::toggle_priority(c, priority, ctx)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_labels(
        &self,
        conversation_id: &str,
        labels: Vec<String>,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, |c, ctx| {
            state_machine::update_labels(c, labels, ctx)
        })
        .await
    }

    #[tracing::instrument(skip(self, attributes))]
    pub async fn update_custom_attributes(
        &self,
        conversation_id: &str,
        attributes: Map<String, Value>,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, |c, ctx| {
            state_machine::update_custom_attributes(c, attributes, ctx)
        })
        .await
    }

    #[tracing::instrument(skip(self, attributes))]
    pub async fn update_additional_attributes(
        &self,
        conversation_id: &str,
        attributes: Value,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, performed_by, |c, ctx| {
            state_machine::update_additional_attributes(c, attributes, ctx)
        })
        .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_contact_seen(&self, conversation_id: &str) -> DomainResult<Conversation> {
        self.transition(conversation_id, None, state_machine::mark_contact_seen)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn mark_agent_seen(
        &self,
        conversation_id: &str,
        agent_id: String,
    ) -> DomainResult<Conversation> {
        self.transition(conversation_id, Some(agent_id), state_machine::mark_agent_seen)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn change_contact(
        &self,
        conversation_id: &str,
        contact_id: String,
        performed_by: Option<String>,
    ) -> DomainResult<Conversation> {
        if self.contact_repo.get_contact_by_id(&contact_id).await?.is_none() {
            return Err(DomainError::NotFound(format!("Contact {}", contact_id)));
        }
        self.transition(conversation_id, performed_by, |c, ctx| {
            state_machine::change_contact(c, contact_id, ctx)
        })
        .await
    }

    async fn transition<F>(
        &self,
        conversation_id: &str,
        performed_by: Option<String>,
        op: F,
    ) -> DomainResult<Conversation>
    where
        F: FnOnce(&mut Conversation, &TransitionContext) -> Vec<DomainEvent> + Send,
    {
        let mut conversation = self.get_conversation(conversation_id).await?;
        let ctx = TransitionContext {
            performed_by,
            now: self.clock.now(),
        };
        let previous_status = conversation.status;

        let events = op(&mut conversation, &ctx);
        self.conversation_repo.save_conversation(&conversation).await?;
        if events.is_empty() {
            tracing::debug!("Conversation {} saved without events", conversation_id);
        }
        if conversation.status != previous_status {
            tracing::info!(
                "Conversation {} moved from {} to {}",
                conversation_id,
                previous_status,
                conversation.status
            );
        }

        self.dispatcher.dispatch_all(&events).await;
        Ok(conversation)
    }
}
