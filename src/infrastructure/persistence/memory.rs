use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::entities::{Contact, Conversation, Inbox, ReportingEvent, ReportingEventName};
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::{
    ContactRepository, ConversationRepository, InboxRepository, ReportingEventRepository,
};

#[derive(Default)]
struct Tables {
    conversations: HashMap<String, Conversation>,
    display_ids: HashMap<String, i64>,
    inboxes: HashMap<String, Inbox>,
    contacts: HashMap<String, Contact>,
    // Insertion order is the record order
    reporting_events: Vec<ReportingEvent>,
}

/// Process-local record store implementing every repository port.
///
/// All tables share one lock, so each port call is atomic with respect to the
/// others.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert_inbox(&self, inbox: Inbox) {
        self.tables.write().await.inboxes.insert(inbox.id.clone(), inbox);
    }

    pub async fn insert_contact(&self, contact: Contact) {
        self.tables
            .write()
            .await
            .contacts
            .insert(contact.id.clone(), contact);
    }

    pub async fn reporting_events(&self) -> Vec<ReportingEvent> {
        self.tables.read().await.reporting_events.clone()
    }
}

/// Latest handoff that no `first_response` record follows.
fn unconsumed_handoff<'a>(
    records: &'a [ReportingEvent],
    conversation_id: &str,
) -> Option<&'a ReportingEvent> {
    records
        .iter()
        .rev()
        .filter(|r| r.conversation_id == conversation_id)
        .take_while(|r| r.name != ReportingEventName::FirstResponse)
        .find(|r| r.name == ReportingEventName::ConversationBotHandoff)
}

#[async_trait]
impl ConversationRepository for MemoryStore {
    async fn create_conversation(&self, conversation: &Conversation) -> DomainResult<Conversation> {
        let mut tables = self.tables.write().await;
        if tables.conversations.contains_key(&conversation.id) {
            return Err(DomainError::Conflict(format!(
                "Conversation {} already exists",
                conversation.id
            )));
        }

        let sequence = tables
            .display_ids
            .entry(conversation.account_id.clone())
            .or_insert(0);
        *sequence += 1;

        let mut stored = conversation.clone();
        stored.display_id = Some(*sequence);
        tables
            .conversations
            .insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }

    async fn get_conversation_by_id(&self, id: &str) -> DomainResult<Option<Conversation>> {
        Ok(self.tables.read().await.conversations.get(id).cloned())
    }

    async fn save_conversation(&self, conversation: &Conversation) -> DomainResult<()> {
        let mut tables = self.tables.write().await;
        match tables.conversations.get_mut(&conversation.id) {
            Some(existing) => {
                *existing = conversation.clone();
                Ok(())
            }
            None => Err(DomainError::NotFound(format!(
                "Conversation {}",
                conversation.id
            ))),
        }
    }
}

#[async_trait]
impl InboxRepository for MemoryStore {
    async fn get_inbox_by_id(&self, id: &str) -> DomainResult<Option<Inbox>> {
        Ok(self.tables.read().await.inboxes.get(id).cloned())
    }
}

#[async_trait]
impl ContactRepository for MemoryStore {
    async fn get_contact_by_id(&self, id: &str) -> DomainResult<Option<Contact>> {
        Ok(self.tables.read().await.contacts.get(id).cloned())
    }
}

#[async_trait]
impl ReportingEventRepository for MemoryStore {
    async fn create_reporting_event(&self, event: &ReportingEvent) -> DomainResult<()> {
        self.tables
            .write()
            .await
            .reporting_events
            .push(event.clone());
        Ok(())
    }

    async fn create_bot_handoff_if_unconsumed(&self, event: &ReportingEvent) -> DomainResult<bool> {
        if event.name != ReportingEventName::ConversationBotHandoff {
            return Err(DomainError::ValidationError(format!(
                "Expected a bot handoff record, got {}",
                event.name
            )));
        }

        let mut tables = self.tables.write().await;
        if unconsumed_handoff(&tables.reporting_events, &event.conversation_id).is_some() {
            return Ok(false);
        }
        tables.reporting_events.push(event.clone());
        Ok(true)
    }

    async fn find_unconsumed_bot_handoff(
        &self,
        conversation_id: &str,
    ) -> DomainResult<Option<ReportingEvent>> {
        let tables = self.tables.read().await;
        Ok(unconsumed_handoff(&tables.reporting_events, conversation_id).cloned())
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
        name: Option<ReportingEventName>,
    ) -> DomainResult<Vec<ReportingEvent>> {
        let tables = self.tables.read().await;
        Ok(tables
            .reporting_events
            .iter()
            .filter(|r| r.conversation_id == conversation_id)
            .filter(|r| name.map_or(true, |n| r.name == n))
            .cloned()
            .collect())
    }
}
