use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::domain::entities::{Contact, Conversation, Inbox, Message};
use crate::domain::errors::DomainResult;
use crate::domain::events::{DomainEvent, EventName, EventPayload};
use crate::domain::ports::{AutomatedResponse, ContactRepository, EventListener, InboxRepository};

pub const DEFAULT_SUPPRESSION_WINDOW_SECS: i64 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    Greeting,
    ContactInfoCollect,
    OutOfOffice,
}

impl HookKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            HookKind::Greeting => "greeting",
            HookKind::ContactInfoCollect => "contact_info_collect",
            HookKind::OutOfOffice => "out_of_office",
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decides which automated responses a newly created message should trigger
/// and invokes them in registration order.
pub struct HookExecutionEngine {
    responders: Vec<(HookKind, Arc<dyn AutomatedResponse>)>,
    inbox_repo: Arc<dyn InboxRepository>,
    contact_repo: Arc<dyn ContactRepository>,
    suppression_window: Duration,
}

impl HookExecutionEngine {
    pub fn new(
        inbox_repo: Arc<dyn InboxRepository>,
        contact_repo: Arc<dyn ContactRepository>,
    ) -> Self {
        Self {
            responders: Vec::new(),
            inbox_repo,
            contact_repo,
            suppression_window: Duration::seconds(DEFAULT_SUPPRESSION_WINDOW_SECS),
        }
    }

    pub fn with_suppression_window(mut self, window: Duration) -> Self {
        self.suppression_window = window;
        self
    }

    pub fn with_responder(mut self, kind: HookKind, responder: Arc<dyn AutomatedResponse>) -> Self {
        self.responders.push((kind, responder));
        self
    }

    /// Evaluate every hook for `message` and return the ones whose responder
    /// reported that it fired.
    pub async fn execute(
        &self,
        message: &Message,
        conversation: &Conversation,
        now: DateTime<Utc>,
    ) -> DomainResult<Vec<HookKind>> {
        if !(message.is_incoming() || message.is_public_outgoing()) {
            return Ok(Vec::new());
        }
        if conversation.is_tweet() || conversation.is_from_campaign() {
            tracing::debug!(
                "Skipping hooks for conversation {} (tweet or campaign)",
                conversation.id
            );
            return Ok(Vec::new());
        }
        if conversation.last_incoming_message().is_none() {
            return Ok(Vec::new());
        }

        let inbox = self.inbox(&conversation.inbox_id).await?;
        let mut contact: Option<Contact> = None;
        let mut fired = Vec::new();

        for (kind, responder) in &self.responders {
            let eligible = match kind {
                HookKind::Greeting => inbox.has_greeting() && is_first_message(conversation),
                HookKind::ContactInfoCollect => {
                    if !inbox.enable_email_collect || !is_first_message(conversation) {
                        false
                    } else {
                        if contact.is_none() {
                            contact = Some(self.contact(&conversation.contact_id).await?);
                        }
                        !contact.as_ref().is_some_and(Contact::has_email)
                    }
                }
                HookKind::OutOfOffice => {
                    message.is_incoming()
                        && inbox.is_out_of_office(now)
                        && !self.recently_replied(conversation, message)
                }
            };
            if !eligible {
                continue;
            }

            match responder.apply(conversation).await {
                Ok(true) => {
                    tracing::info!("Hook {} fired for conversation {}", kind, conversation.id);
                    metrics::counter!("convopulse_hooks_fired_total", "hook" => kind.as_str())
                        .increment(1);
                    fired.push(*kind);
                }
                Ok(false) => {
                    tracing::debug!(
                        "Hook {} produced nothing for conversation {}",
                        kind,
                        conversation.id
                    );
                }
                Err(e) => {
                    tracing::error!(
                        "Hook {} failed for conversation {}: {}",
                        kind,
                        conversation.id,
                        e
                    );
                }
            }
        }

        Ok(fired)
    }

    /// A public outgoing message went out within the suppression window
    /// before `message`. Private notes do not count.
    fn recently_replied(&self, conversation: &Conversation, message: &Message) -> bool {
        let since = message.created_at - self.suppression_window;
        conversation.messages.iter().any(|m| {
            m.id != message.id
                && m.is_public_outgoing()
                && m.created_at >= since
                && m.created_at <= message.created_at
        })
    }

    async fn inbox(&self, inbox_id: &str) -> DomainResult<Inbox> {
        match self.inbox_repo.get_inbox_by_id(inbox_id).await? {
            Some(inbox) => Ok(inbox),
            None => panic!("inbox {} referenced by a domain event does not exist", inbox_id),
        }
    }

    async fn contact(&self, contact_id: &str) -> DomainResult<Contact> {
        match self.contact_repo.get_contact_by_id(contact_id).await? {
            Some(contact) => Ok(contact),
            None => panic!(
                "contact {} referenced by a domain event does not exist",
                contact_id
            ),
        }
    }
}

/// The contact's opening message: nothing outgoing yet and a single incoming.
fn is_first_message(conversation: &Conversation) -> bool {
    let mut incoming = 0;
    for message in &conversation.messages {
        if message.is_outgoing() {
            return false;
        }
        if message.is_incoming() {
            incoming += 1;
        }
    }
    incoming == 1
}

#[async_trait]
impl EventListener for HookExecutionEngine {
    async fn handle(&self, event: &DomainEvent) -> DomainResult<()> {
        if let EventPayload::MessageCreated {
            message,
            conversation,
        } = &event.payload
        {
            self.execute(message, conversation, event.occurred_at).await?;
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "hook_execution_engine"
    }

    fn subscriptions(&self) -> &'static [EventName] {
        &[EventName::MessageCreated]
    }
}
