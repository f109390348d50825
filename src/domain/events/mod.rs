pub mod changes;

pub use changes::*;

use crate::domain::entities::{Conversation, Message};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Names of the domain events routed by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventName {
    #[serde(rename = "conversation.created")]
    ConversationCreated,
    #[serde(rename = "conversation.updated")]
    ConversationUpdated,
    #[serde(rename = "conversation.opened")]
    ConversationOpened,
    #[serde(rename = "conversation.resolved")]
    ConversationResolved,
    #[serde(rename = "conversation.status_changed")]
    ConversationStatusChanged,
    #[serde(rename = "conversation.read")]
    ConversationRead,
    #[serde(rename = "conversation.contact_changed")]
    ConversationContactChanged,
    #[serde(rename = "conversation.bot_handoff")]
    ConversationBotHandoff,
    #[serde(rename = "message.created")]
    MessageCreated,
    #[serde(rename = "first.reply.created")]
    FirstReplyCreated,
    #[serde(rename = "reply.created")]
    ReplyCreated,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::ConversationCreated => "conversation.created",
            EventName::ConversationUpdated => "conversation.updated",
            EventName::ConversationOpened => "conversation.opened",
            EventName::ConversationResolved => "conversation.resolved",
            EventName::ConversationStatusChanged => "conversation.status_changed",
            EventName::ConversationRead => "conversation.read",
            EventName::ConversationContactChanged => "conversation.contact_changed",
            EventName::ConversationBotHandoff => "conversation.bot_handoff",
            EventName::MessageCreated => "message.created",
            EventName::FirstReplyCreated => "first.reply.created",
            EventName::ReplyCreated => "reply.created",
        }
    }
}

impl fmt::Display for EventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Payload shared by every `conversation.*` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationEventData {
    pub conversation: Conversation,
    pub notifiable_assignee_change: bool,
    pub changed_attributes: Option<ChangedAttributes>,
    pub performed_by: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Conversation(ConversationEventData),
    MessageCreated {
        message: Message,
        conversation: Conversation,
    },
    Reply {
        waiting_since: Option<DateTime<Utc>>,
        message: Message,
    },
    FirstReply {
        message: Message,
    },
}

/// A named fact about a conversation. `occurred_at` is the logical clock of
/// the event, not the moment a listener happens to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainEvent {
    pub id: String,
    pub name: EventName,
    pub occurred_at: DateTime<Utc>,
    pub payload: EventPayload,
}

impl DomainEvent {
    pub fn new(name: EventName, occurred_at: DateTime<Utc>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            occurred_at,
            payload,
        }
    }

    /// Event carrying only a conversation snapshot.
    pub fn for_conversation(
        name: EventName,
        occurred_at: DateTime<Utc>,
        conversation: &Conversation,
    ) -> Self {
        Self::new(
            name,
            occurred_at,
            EventPayload::Conversation(ConversationEventData {
                conversation: conversation.clone(),
                notifiable_assignee_change: false,
                changed_attributes: None,
                performed_by: None,
            }),
        )
    }

    pub fn message_created(
        occurred_at: DateTime<Utc>,
        message: &Message,
        conversation: &Conversation,
    ) -> Self {
        Self::new(
            EventName::MessageCreated,
            occurred_at,
            EventPayload::MessageCreated {
                message: message.clone(),
                conversation: conversation.clone(),
            },
        )
    }

    pub fn reply_created(
        occurred_at: DateTime<Utc>,
        waiting_since: Option<DateTime<Utc>>,
        message: &Message,
    ) -> Self {
        Self::new(
            EventName::ReplyCreated,
            occurred_at,
            EventPayload::Reply {
                waiting_since,
                message: message.clone(),
            },
        )
    }

    pub fn first_reply_created(occurred_at: DateTime<Utc>, message: &Message) -> Self {
        Self::new(
            EventName::FirstReplyCreated,
            occurred_at,
            EventPayload::FirstReply {
                message: message.clone(),
            },
        )
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        match &self.payload {
            EventPayload::Conversation(data) => Some(&data.conversation),
            EventPayload::MessageCreated { conversation, .. } => Some(conversation),
            _ => None,
        }
    }

    pub fn message(&self) -> Option<&Message> {
        match &self.payload {
            EventPayload::MessageCreated { message, .. }
            | EventPayload::Reply { message, .. }
            | EventPayload::FirstReply { message } => Some(message),
            EventPayload::Conversation(_) => None,
        }
    }

    pub fn changed_attributes(&self) -> Option<&ChangedAttributes> {
        match &self.payload {
            EventPayload::Conversation(data) => data.changed_attributes.as_ref(),
            _ => None,
        }
    }

    pub fn conversation_id(&self) -> Option<&str> {
        self.conversation()
            .map(|c| c.id.as_str())
            .or_else(|| self.message().map(|m| m.conversation_id.as_str()))
    }
}
