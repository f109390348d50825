use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportingEventName {
    ConversationResolved,
    ConversationBotResolved,
    ConversationBotHandoff,
    ReplyTime,
    FirstResponse,
}

impl ReportingEventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportingEventName::ConversationResolved => "conversation_resolved",
            ReportingEventName::ConversationBotResolved => "conversation_bot_resolved",
            ReportingEventName::ConversationBotHandoff => "conversation_bot_handoff",
            ReportingEventName::ReplyTime => "reply_time",
            ReportingEventName::FirstResponse => "first_response",
        }
    }
}

impl fmt::Display for ReportingEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Append-only metric record derived from a domain event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportingEvent {
    pub id: String,
    pub name: ReportingEventName,
    /// Wall-clock seconds.
    pub value: f64,
    /// Seconds overlapping the inbox's working hours.
    pub value_in_business_hours: f64,
    pub account_id: String,
    pub inbox_id: String,
    pub conversation_id: String,
    pub user_id: Option<String>,
    pub event_start_time: DateTime<Utc>,
    pub event_end_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl ReportingEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        name: ReportingEventName,
        value: f64,
        value_in_business_hours: f64,
        account_id: &str,
        inbox_id: &str,
        conversation_id: &str,
        user_id: Option<String>,
        window: (DateTime<Utc>, DateTime<Utc>),
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name,
            value,
            value_in_business_hours,
            account_id: account_id.to_string(),
            inbox_id: inbox_id.to_string(),
            conversation_id: conversation_id.to_string(),
            user_id,
            event_start_time: window.0,
            event_end_time: window.1,
            created_at,
        }
    }
}
