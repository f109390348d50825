use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message type indicating direction of communication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Incoming, // From customer to agent
    Outgoing, // From agent (or bot) to customer
    Activity, // System generated, e.g. "Conversation marked resolved"
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::Incoming => "incoming",
            MessageType::Outgoing => "outgoing",
            MessageType::Activity => "activity",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderType {
    Contact,
    Agent,
    Bot,
}

/// Message entity. Immutable once created apart from delivery state, which
/// lives elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub account_id: String,
    pub inbox_id: String,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    /// Internal note; only meaningful for outgoing messages.
    pub private: bool,
    pub content: String,
    pub sender_id: Option<String>,
    pub sender_type: Option<SenderType>,
    pub created_at: DateTime<Utc>,
}

/// Input for appending a message to a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    pub conversation_id: String,
    pub message_type: MessageType,
    #[serde(default)]
    pub private: bool,
    pub content: String,
    pub sender_id: Option<String>,
    pub sender_type: Option<SenderType>,
    /// Defaults to the service clock when absent (imports carry their own timestamps).
    pub created_at: Option<DateTime<Utc>>,
}

impl NewMessage {
    pub fn incoming(conversation_id: &str, content: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            message_type: MessageType::Incoming,
            private: false,
            content: content.to_string(),
            sender_id: None,
            sender_type: Some(SenderType::Contact),
            created_at: None,
        }
    }

    pub fn outgoing(conversation_id: &str, content: &str, agent_id: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            message_type: MessageType::Outgoing,
            private: false,
            content: content.to_string(),
            sender_id: Some(agent_id.to_string()),
            sender_type: Some(SenderType::Agent),
            created_at: None,
        }
    }

    pub fn private_note(conversation_id: &str, content: &str, agent_id: &str) -> Self {
        Self {
            private: true,
            ..Self::outgoing(conversation_id, content, agent_id)
        }
    }

    pub fn activity(conversation_id: &str, content: &str) -> Self {
        Self {
            conversation_id: conversation_id.to_string(),
            message_type: MessageType::Activity,
            private: false,
            content: content.to_string(),
            sender_id: None,
            sender_type: None,
            created_at: None,
        }
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn from_bot(mut self) -> Self {
        self.sender_type = Some(SenderType::Bot);
        self
    }
}

impl Message {
    pub fn build(
        new: NewMessage,
        account_id: &str,
        inbox_id: &str,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            conversation_id: new.conversation_id,
            account_id: account_id.to_string(),
            inbox_id: inbox_id.to_string(),
            message_type: new.message_type,
            private: new.private,
            content: new.content,
            sender_id: new.sender_id,
            sender_type: new.sender_type,
            created_at: new.created_at.unwrap_or(now),
        }
    }

    pub fn is_incoming(&self) -> bool {
        self.message_type == MessageType::Incoming
    }

    pub fn is_outgoing(&self) -> bool {
        self.message_type == MessageType::Outgoing
    }

    /// Outgoing and visible to the customer.
    pub fn is_public_outgoing(&self) -> bool {
        self.is_outgoing() && !self.private
    }

    /// A public outgoing message written by a person rather than a bot.
    pub fn is_human_reply(&self) -> bool {
        self.is_public_outgoing() && self.sender_type != Some(SenderType::Bot)
    }

    pub fn validate_content(content: &str) -> Result<(), String> {
        let len = content.chars().count();
        if len > 150_000 {
            return Err(format!(
                "Message content too long: {} characters (max 150,000)",
                len
            ));
        }
        Ok(())
    }
}
