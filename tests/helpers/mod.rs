#![allow(dead_code)]
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use std::sync::{Arc, Mutex};

use convopulse::application::listeners::HookKind;
use convopulse::bootstrap::{build_app, App};
use convopulse::config::Config;
use convopulse::domain::entities::{
    Contact, Conversation, CreateConversation, Inbox, Message, NewMessage, ReportingEvent,
    ReportingEventName,
};
use convopulse::domain::errors::{DomainError, DomainResult};
use convopulse::domain::events::{DomainEvent, EventName};
use convopulse::domain::ports::{AutomatedResponse, EventListener, ManualClock};

pub const ACCOUNT: &str = "acc-1";
pub const INBOX: &str = "inbox-1";
pub const CONTACT: &str = "contact-1";
pub const AGENT: &str = "agent-1";

pub fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

/// Responder that counts invocations.
pub struct RecordingResponse {
    calls: Mutex<Vec<String>>,
}

impl RecordingResponse {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AutomatedResponse for RecordingResponse {
    async fn apply(&self, conversation: &Conversation) -> DomainResult<bool> {
        self.calls.lock().unwrap().push(conversation.id.clone());
        Ok(true)
    }
}

/// Listener that records every event it sees, optionally failing afterwards.
pub struct RecordingListener {
    name: &'static str,
    fail: bool,
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingListener {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fail: false,
            events: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            fail: true,
            ..Self::new(name)
        }
    }

    pub fn names(&self) -> Vec<EventName> {
        self.events.lock().unwrap().iter().map(|e| e.name).collect()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventListener for RecordingListener {
    async fn handle(&self, event: &DomainEvent) -> DomainResult<()> {
        self.events.lock().unwrap().push(event.clone());
        if self.fail {
            return Err(DomainError::Internal(format!("{} always fails", self.name)));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn subscriptions(&self) -> &'static [EventName] {
        &[
            EventName::ConversationCreated,
            EventName::ConversationUpdated,
            EventName::ConversationOpened,
            EventName::ConversationResolved,
            EventName::ConversationStatusChanged,
            EventName::ConversationRead,
            EventName::ConversationContactChanged,
            EventName::ConversationBotHandoff,
            EventName::MessageCreated,
            EventName::FirstReplyCreated,
            EventName::ReplyCreated,
        ]
    }
}

pub struct TestEnv {
    pub app: App,
    pub clock: Arc<ManualClock>,
    pub greeting: Arc<RecordingResponse>,
    pub contact_info: Arc<RecordingResponse>,
    pub out_of_office: Arc<RecordingResponse>,
    pub listener: Arc<RecordingListener>,
}

impl TestEnv {
    pub async fn new(start: DateTime<Utc>) -> Self {
        Self::with_listeners(start, Vec::new()).await
    }

    /// `extra` listeners run after the built-in ones and before the recording listener.
    pub async fn with_listeners(start: DateTime<Utc>, extra: Vec<Arc<dyn EventListener>>) -> Self {
        let clock = Arc::new(ManualClock::new(start));
        let greeting = Arc::new(RecordingResponse::new());
        let contact_info = Arc::new(RecordingResponse::new());
        let out_of_office = Arc::new(RecordingResponse::new());
        let listener = Arc::new(RecordingListener::new("recording"));

        let responders: Vec<(HookKind, Arc<dyn AutomatedResponse>)> = vec![
            (HookKind::Greeting, greeting.clone() as Arc<dyn AutomatedResponse>),
            (HookKind::ContactInfoCollect, contact_info.clone() as Arc<dyn AutomatedResponse>),
            (HookKind::OutOfOffice, out_of_office.clone() as Arc<dyn AutomatedResponse>),
        ];
        let mut listeners = extra;
        listeners.push(listener.clone());

        let app = build_app(&Config::default(), clock.clone(), responders, listeners);

        let env = Self {
            app,
            clock,
            greeting,
            contact_info,
            out_of_office,
            listener,
        };
        env.app
            .store
            .insert_inbox(Inbox::new(INBOX, ACCOUNT, Tz::UTC))
            .await;
        let mut contact = Contact::new(CONTACT, ACCOUNT);
        contact.email = Some("customer@example.com".to_string());
        env.app.store.insert_contact(contact).await;
        env
    }

    pub async fn set_inbox(&self, inbox: Inbox) {
        self.app.store.insert_inbox(inbox).await;
    }

    pub async fn set_contact(&self, contact: Contact) {
        self.app.store.insert_contact(contact).await;
    }

    pub async fn create_conversation(&self) -> Conversation {
        self.create_conversation_with(CreateConversation::default())
            .await
    }

    pub async fn create_conversation_with(&self, request: CreateConversation) -> Conversation {
        let request = CreateConversation {
            account_id: ACCOUNT.to_string(),
            inbox_id: INBOX.to_string(),
            contact_id: if request.contact_id.is_empty() {
                CONTACT.to_string()
            } else {
                request.contact_id
            },
            ..request
        };
        self.app
            .conversations
            .create_conversation(request, None)
            .await
            .expect("create conversation")
    }

    pub async fn conversation(&self, id: &str) -> Conversation {
        self.app
            .conversations
            .get_conversation(id)
            .await
            .expect("conversation exists")
    }

    pub async fn send(&self, message: NewMessage) -> Message {
        self.app
            .messages
            .create_message(message)
            .await
            .expect("create message")
    }

    /// Incoming message stamped with the current clock.
    pub async fn customer_says(&self, conversation_id: &str, content: &str) -> Message {
        self.send(NewMessage::incoming(conversation_id, content)).await
    }

    /// Outgoing agent message stamped with the current clock.
    pub async fn agent_says(&self, conversation_id: &str, content: &str) -> Message {
        self.send(NewMessage::outgoing(conversation_id, content, AGENT))
            .await
    }

    pub async fn records(&self, conversation_id: &str, name: ReportingEventName) -> Vec<ReportingEvent> {
        self.app
            .store
            .reporting_events()
            .await
            .into_iter()
            .filter(|r| r.conversation_id == conversation_id && r.name == name)
            .collect()
    }
}
