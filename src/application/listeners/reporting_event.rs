use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::entities::{Conversation, Inbox, Message, ReportingEvent, ReportingEventName};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::events::{DomainEvent, EventName, EventPayload};
use crate::domain::ports::{
    ConversationRepository, EventListener, InboxRepository, ReportingEventRepository,
};
use crate::domain::services::business_hours::{duration_in_business_hours, wall_clock_seconds};

const SUBSCRIPTIONS: &[EventName] = &[
    EventName::ConversationResolved,
    EventName::ConversationBotHandoff,
    EventName::ReplyCreated,
    EventName::FirstReplyCreated,
];

/// Turns lifecycle events into reporting records. Each record carries a
/// wall-clock value and the same duration clipped to the inbox's working hours.
pub struct ReportingEventRecorder {
    reporting_repo: Arc<dyn ReportingEventRepository>,
    inbox_repo: Arc<dyn InboxRepository>,
    conversation_repo: Arc<dyn ConversationRepository>,
}

impl ReportingEventRecorder {
    pub fn new(
        reporting_repo: Arc<dyn ReportingEventRepository>,
        inbox_repo: Arc<dyn InboxRepository>,
        conversation_repo: Arc<dyn ConversationRepository>,
    ) -> Self {
        Self {
            reporting_repo,
            inbox_repo,
            conversation_repo,
        }
    }

    pub async fn conversation_resolved(
        &self,
        event: &DomainEvent,
        conversation: &Conversation,
    ) -> DomainResult<()> {
        let inbox = self.inbox(&conversation.inbox_id).await?;
        let window = (conversation.created_at, conversation.updated_at);

        let record = self.build(
            ReportingEventName::ConversationResolved,
            &inbox,
            conversation,
            conversation.assignee_id.clone(),
            window,
            event.occurred_at,
        );
        self.store(&record).await?;

        if inbox.active_bot && !conversation.has_human_reply() {
            let record = self.build(
                ReportingEventName::ConversationBotResolved,
                &inbox,
                conversation,
                None,
                window,
                event.occurred_at,
            );
            self.store(&record).await?;
        }
        Ok(())
    }

    /// At most one unconsumed handoff record exists per conversation; repeats
    /// before the next first response are dropped.
    pub async fn conversation_bot_handoff(
        &self,
        event: &DomainEvent,
        conversation: &Conversation,
    ) -> DomainResult<()> {
        let inbox = self.inbox(&conversation.inbox_id).await?;
        let value = wall_clock_seconds(conversation.created_at, conversation.updated_at);
        let in_business_hours = duration_in_business_hours(
            conversation.created_at,
            conversation.updated_at,
            &inbox.working_hours,
        );

        let record = ReportingEvent::new(
            ReportingEventName::ConversationBotHandoff,
            value,
            in_business_hours,
            &conversation.account_id,
            &conversation.inbox_id,
            &conversation.id,
            conversation.assignee_id.clone(),
            // The end of the window is what a later first response is measured from
            (conversation.created_at, event.occurred_at),
            event.occurred_at,
        );

        if self
            .reporting_repo
            .create_bot_handoff_if_unconsumed(&record)
            .await?
        {
            tracing::info!("Recorded bot handoff for conversation {}", conversation.id);
            metrics::counter!("convopulse_reporting_events_total", "name" => record.name.as_str())
                .increment(1);
        } else {
            tracing::debug!(
                "Conversation {} already has a pending bot handoff, skipping",
                conversation.id
            );
        }
        Ok(())
    }

    pub async fn reply_created(
        &self,
        event: &DomainEvent,
        waiting_since: Option<DateTime<Utc>>,
        message: &Message,
    ) -> DomainResult<()> {
        let Some(waiting_since) = waiting_since else {
            tracing::debug!(
                "Reply {} owed nothing, no reply time recorded",
                message.id
            );
            return Ok(());
        };

        let conversation = self.conversation(&message.conversation_id).await?;
        let inbox = self.inbox(&conversation.inbox_id).await?;
        let record = self.build(
            ReportingEventName::ReplyTime,
            &inbox,
            &conversation,
            message.sender_id.clone(),
            (waiting_since, message.created_at),
            event.occurred_at,
        );
        self.store(&record).await
    }

    /// Measured from conversation creation, or from the latest bot handoff not
    /// yet consumed by an earlier first response if that is later.
    pub async fn first_reply_created(
        &self,
        event: &DomainEvent,
        message: &Message,
    ) -> DomainResult<()> {
        let conversation = self.conversation(&message.conversation_id).await?;
        let inbox = self.inbox(&conversation.inbox_id).await?;

        let handoff_at = self
            .reporting_repo
            .find_unconsumed_bot_handoff(&conversation.id)
            .await?
            .map(|handoff| handoff.event_end_time);
        let anchor = match handoff_at {
            Some(at) => at.max(conversation.created_at),
            None => conversation.created_at,
        };

        let record = self.build(
            ReportingEventName::FirstResponse,
            &inbox,
            &conversation,
            message.sender_id.clone(),
            (anchor, message.created_at),
            event.occurred_at,
        );
        self.store(&record).await
    }

    fn build(
        &self,
        name: ReportingEventName,
        inbox: &Inbox,
        conversation: &Conversation,
        user_id: Option<String>,
        (start, end): (DateTime<Utc>, DateTime<Utc>),
        created_at: DateTime<Utc>,
    ) -> ReportingEvent {
        ReportingEvent::new(
            name,
            wall_clock_seconds(start, end),
            duration_in_business_hours(start, end, &inbox.working_hours),
            &conversation.account_id,
            &conversation.inbox_id,
            &conversation.id,
            user_id,
            (start, end),
            created_at,
        )
    }

    async fn store(&self, record: &ReportingEvent) -> DomainResult<()> {
        self.reporting_repo.create_reporting_event(record).await?;
        tracing::info!(
            "Recorded {} for conversation {}: {}s ({}s in business hours)",
            record.name,
            record.conversation_id,
            record.value,
            record.value_in_business_hours
        );
        metrics::counter!("convopulse_reporting_events_total", "name" => record.name.as_str())
            .increment(1);
        Ok(())
    }

    async fn inbox(&self, inbox_id: &str) -> DomainResult<Inbox> {
        match self.inbox_repo.get_inbox_by_id(inbox_id).await? {
            Some(inbox) => Ok(inbox),
            None => panic!("inbox {} referenced by a domain event does not exist", inbox_id),
        }
    }

    async fn conversation(&self, conversation_id: &str) -> DomainResult<Conversation> {
        match self
            .conversation_repo
            .get_conversation_by_id(conversation_id)
            .await?
        {
            Some(conversation) => Ok(conversation),
            None => panic!(
                "conversation {} referenced by a domain event does not exist",
                conversation_id
            ),
        }
    }
}

#[async_trait]
impl EventListener for ReportingEventRecorder {
    async fn handle(&self, event: &DomainEvent) -> DomainResult<()> {
        match (&event.name, &event.payload) {
            (EventName::ConversationResolved, EventPayload::Conversation(data)) => {
                self.conversation_resolved(event, &data.conversation).await
            }
            (EventName::ConversationBotHandoff, EventPayload::Conversation(data)) => {
                self.conversation_bot_handoff(event, &data.conversation).await
            }
            (
                EventName::ReplyCreated,
                EventPayload::Reply {
                    waiting_since,
                    message,
                },
            ) => self.reply_created(event, *waiting_since, message).await,
            (EventName::FirstReplyCreated, EventPayload::FirstReply { message }) => {
                self.first_reply_created(event, message).await
            }
            (name, _) => Err(DomainError::ValidationError(format!(
                "Unexpected payload for {} in reporting recorder",
                name
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "reporting_event_recorder"
    }

    fn subscriptions(&self) -> &'static [EventName] {
        SUBSCRIPTIONS
    }
}
