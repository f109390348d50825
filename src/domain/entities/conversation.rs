use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::message::{Message, MessageType};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Open,
    Resolved,
    Pending,
    Snoozed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Open => "open",
            ConversationStatus::Resolved => "resolved",
            ConversationStatus::Pending => "pending",
            ConversationStatus::Snoozed => "snoozed",
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<String> for ConversationStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "resolved" => ConversationStatus::Resolved,
            "pending" => ConversationStatus::Pending,
            "snoozed" => ConversationStatus::Snoozed,
            _ => ConversationStatus::Open,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Priority::Low => write!(f, "low"),
            Priority::Medium => write!(f, "medium"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

/// Channel-specific flavour of a conversation. Tweets never receive
/// automated template responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationType {
    #[default]
    Standard,
    Tweet,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    /// Per-account sequence number assigned by the record store after insert.
    pub display_id: Option<i64>,
    pub account_id: String,
    pub inbox_id: String,
    pub contact_id: String,
    pub status: ConversationStatus,
    pub waiting_since: Option<DateTime<Utc>>,
    pub first_reply_created_at: Option<DateTime<Utc>>,
    pub snoozed_until: Option<DateTime<Utc>>,
    pub assignee_id: Option<String>,
    pub team_id: Option<String>,
    pub priority: Option<Priority>,
    pub labels: Vec<String>,
    pub custom_attributes: Map<String, Value>,
    pub additional_attributes: Map<String, Value>,
    pub campaign_id: Option<String>,
    pub conversation_type: ConversationType,
    pub contact_last_seen_at: Option<DateTime<Utc>>,
    pub agent_last_seen_at: Option<DateTime<Utc>>,
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for opening a new conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateConversation {
    pub account_id: String,
    pub inbox_id: String,
    pub contact_id: String,
    pub campaign_id: Option<String>,
    pub conversation_type: ConversationType,
    pub assignee_id: Option<String>,
    pub team_id: Option<String>,
    /// Raw attributes as received; anything other than a JSON object is dropped.
    pub additional_attributes: Option<Value>,
    pub custom_attributes: Map<String, Value>,
}

impl CreateConversation {
    pub fn validate(&self) -> Result<(), String> {
        if self.contact_id.trim().is_empty() {
            return Err("Conversation must have exactly one contact".to_string());
        }
        if self.inbox_id.trim().is_empty() {
            return Err("Conversation must belong to an inbox".to_string());
        }
        Ok(())
    }
}

impl Conversation {
    pub fn is_from_campaign(&self) -> bool {
        self.campaign_id.is_some()
    }

    pub fn is_tweet(&self) -> bool {
        self.conversation_type == ConversationType::Tweet
    }

    pub fn language(&self) -> Option<&str> {
        self.additional_attributes
            .get("conversation_language")
            .and_then(Value::as_str)
    }

    /// Either nobody has ever replied, or a customer message is still unanswered.
    pub fn is_unattended(&self) -> bool {
        self.first_reply_created_at.is_none() || self.waiting_since.is_some()
    }

    pub fn last_incoming_message(&self) -> Option<&Message> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.message_type == MessageType::Incoming)
    }

    pub fn has_human_reply(&self) -> bool {
        self.messages.iter().any(Message::is_human_reply)
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.messages
            .last()
            .map(|m| m.created_at)
            .unwrap_or(self.created_at)
    }
}

/// Coerce arbitrary JSON into an attribute map; non-objects become empty.
pub fn sanitize_attributes(raw: Option<Value>) -> Map<String, Value> {
    match raw {
        Some(Value::Object(map)) => map,
        Some(other) => {
            tracing::debug!("Discarding non-object additional attributes: {}", other);
            Map::new()
        }
        None => Map::new(),
    }
}

/// Null out a `referer` attribute that is not an absolute http(s) URL.
pub fn sanitize_referer(attributes: &mut Map<String, Value>) {
    let Some(referer) = attributes.get("referer") else {
        return;
    };
    if referer.is_null() {
        return;
    }

    let valid = referer
        .as_str()
        .and_then(|s| s.parse::<http::Uri>().ok())
        .map(|uri| {
            matches!(uri.scheme_str(), Some("http") | Some("https")) && uri.host().is_some()
        })
        .unwrap_or(false);

    if !valid {
        attributes.insert("referer".to_string(), Value::Null);
    }
}
