use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::domain::entities::Conversation;

/// Conversation fields whose changes are captured in a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationField {
    Status,
    AssigneeId,
    TeamId,
    Priority,
    SnoozedUntil,
    CustomAttributes,
    Labels,
    WaitingSince,
    FirstReplyCreatedAt,
    AdditionalAttributes,
    ContactId,
    ContactLastSeenAt,
    AgentLastSeenAt,
}

impl ConversationField {
    pub const ALL: [ConversationField; 13] = [
        ConversationField::Status,
        ConversationField::AssigneeId,
        ConversationField::TeamId,
        ConversationField::Priority,
        ConversationField::SnoozedUntil,
        ConversationField::CustomAttributes,
        ConversationField::Labels,
        ConversationField::WaitingSince,
        ConversationField::FirstReplyCreatedAt,
        ConversationField::AdditionalAttributes,
        ConversationField::ContactId,
        ConversationField::ContactLastSeenAt,
        ConversationField::AgentLastSeenAt,
    ];

    /// Fields that subscribers of `conversation.updated` care about.
    pub fn is_externally_relevant(&self) -> bool {
        matches!(
            self,
            ConversationField::Status
                | ConversationField::AssigneeId
                | ConversationField::TeamId
                | ConversationField::Priority
                | ConversationField::SnoozedUntil
                | ConversationField::CustomAttributes
                | ConversationField::Labels
                | ConversationField::WaitingSince
                | ConversationField::FirstReplyCreatedAt
        )
    }

    fn read(&self, conversation: &Conversation) -> Value {
        let value = match self {
            ConversationField::Status => serde_json::to_value(conversation.status),
            ConversationField::AssigneeId => serde_json::to_value(&conversation.assignee_id),
            ConversationField::TeamId => serde_json::to_value(&conversation.team_id),
            ConversationField::Priority => serde_json::to_value(conversation.priority),
            ConversationField::SnoozedUntil => serde_json::to_value(conversation.snoozed_until),
            ConversationField::CustomAttributes => {
                serde_json::to_value(&conversation.custom_attributes)
            }
            ConversationField::Labels => serde_json::to_value(&conversation.labels),
            ConversationField::WaitingSince => serde_json::to_value(conversation.waiting_since),
            ConversationField::FirstReplyCreatedAt => {
                serde_json::to_value(conversation.first_reply_created_at)
            }
            ConversationField::AdditionalAttributes => {
                serde_json::to_value(&conversation.additional_attributes)
            }
            ConversationField::ContactId => serde_json::to_value(&conversation.contact_id),
            ConversationField::ContactLastSeenAt => {
                serde_json::to_value(conversation.contact_last_seen_at)
            }
            ConversationField::AgentLastSeenAt => {
                serde_json::to_value(conversation.agent_last_seen_at)
            }
        };
        value.unwrap_or(Value::Null)
    }
}

/// Values of every tracked field, taken before a mutation.
#[derive(Debug, Clone)]
pub struct TrackedSnapshot(BTreeMap<ConversationField, Value>);

impl TrackedSnapshot {
    pub fn capture(conversation: &Conversation) -> Self {
        Self(
            ConversationField::ALL
                .iter()
                .map(|field| (*field, field.read(conversation)))
                .collect(),
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeChange {
    pub previous: Value,
    pub current: Value,
}

/// Before/after pairs for the tracked fields a transition actually changed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChangedAttributes(BTreeMap<ConversationField, AttributeChange>);

impl ChangedAttributes {
    pub fn between(before: &TrackedSnapshot, after: &Conversation) -> Self {
        let after = TrackedSnapshot::capture(after);
        Self(
            before
                .0
                .iter()
                .filter_map(|(field, previous)| {
                    let current = after.0.get(field).cloned().unwrap_or(Value::Null);
                    (previous != &current).then(|| {
                        (
                            *field,
                            AttributeChange {
                                previous: previous.clone(),
                                current,
                            },
                        )
                    })
                })
                .collect(),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: ConversationField) -> bool {
        self.0.contains_key(&field)
    }

    pub fn get(&self, field: ConversationField) -> Option<&AttributeChange> {
        self.0.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &ConversationField> {
        self.0.keys()
    }

    fn language_changed(&self) -> bool {
        self.get(ConversationField::AdditionalAttributes)
            .is_some_and(|change| {
                change.previous.get("conversation_language")
                    != change.current.get("conversation_language")
            })
    }

    /// True when the diff touches a field `conversation.updated` is published for.
    pub fn is_externally_relevant(&self) -> bool {
        self.0.keys().any(ConversationField::is_externally_relevant) || self.language_changed()
    }

    /// The part of the diff published to listeners: relevant fields, plus the
    /// `conversation_language` sub-field when it changed.
    pub fn externally_relevant(&self) -> Self {
        let mut relevant: BTreeMap<_, _> = self
            .0
            .iter()
            .filter(|(field, _)| field.is_externally_relevant())
            .map(|(field, change)| (*field, change.clone()))
            .collect();

        if let Some(change) = self
            .get(ConversationField::AdditionalAttributes)
            .filter(|_| self.language_changed())
        {
            let language = |value: &Value| {
                serde_json::json!({
                    "conversation_language": value.get("conversation_language").cloned().unwrap_or(Value::Null)
                })
            };
            relevant.insert(
                ConversationField::AdditionalAttributes,
                AttributeChange {
                    previous: language(&change.previous),
                    current: language(&change.current),
                },
            );
        }
        Self(relevant)
    }
}
