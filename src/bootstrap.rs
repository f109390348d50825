use std::sync::Arc;

use crate::application::dispatcher::EventDispatcher;
use crate::application::listeners::{HookExecutionEngine, HookKind, ReportingEventRecorder};
use crate::application::services::{ConversationService, MessageService};
use crate::config::Config;
use crate::domain::entities::Inbox;
use crate::domain::ports::{
    AutomatedResponse, Clock, ContactRepository, ConversationRepository, EventListener,
    InboxRepository, ReportingEventRepository,
};
use crate::infrastructure::persistence::MemoryStore;
use crate::infrastructure::providers::LoggingResponse;

/// Fully wired application over an in-memory store.
pub struct App {
    pub config: Config,
    pub store: Arc<MemoryStore>,
    pub dispatcher: Arc<EventDispatcher>,
    pub conversations: ConversationService,
    pub messages: MessageService,
}

impl App {
    /// Inbox in the configured default timezone.
    pub fn new_inbox(&self, id: &str, account_id: &str) -> Inbox {
        Inbox::new(id, account_id, self.config.default_timezone)
    }
}

/// Logging responders for every hook, in greeting, contact info, out of
/// office order.
pub fn default_responders() -> Vec<(HookKind, Arc<dyn AutomatedResponse>)> {
    [
        HookKind::Greeting,
        HookKind::ContactInfoCollect,
        HookKind::OutOfOffice,
    ]
    .into_iter()
    .map(|kind| (kind, Arc::new(LoggingResponse::new(kind)) as Arc<dyn AutomatedResponse>))
    .collect()
}

/// Build the dispatcher and services. Listeners run in this order: reporting
/// recorder, hook engine, then `extra_listeners` as given.
pub fn build_app(
    config: &Config,
    clock: Arc<dyn Clock>,
    responders: Vec<(HookKind, Arc<dyn AutomatedResponse>)>,
    extra_listeners: Vec<Arc<dyn EventListener>>,
) -> App {
    let store = Arc::new(MemoryStore::new());
    let conversation_repo: Arc<dyn ConversationRepository> = store.clone();
    let inbox_repo: Arc<dyn InboxRepository> = store.clone();
    let contact_repo: Arc<dyn ContactRepository> = store.clone();
    let reporting_repo: Arc<dyn ReportingEventRepository> = store.clone();

    let mut dispatcher = EventDispatcher::new();

    dispatcher.register(Arc::new(ReportingEventRecorder::new(
        reporting_repo,
        inbox_repo.clone(),
        conversation_repo.clone(),
    )));

    let hooks = responders.into_iter().fold(
        HookExecutionEngine::new(inbox_repo.clone(), contact_repo.clone())
            .with_suppression_window(config.out_of_office_suppression_window),
        |engine, (kind, responder)| engine.with_responder(kind, responder),
    );
    dispatcher.register(Arc::new(hooks));

    for listener in extra_listeners {
        tracing::info!("Registering listener {}", listener.name());
        dispatcher.register(listener);
    }

    let dispatcher = Arc::new(dispatcher);
    tracing::info!("Event dispatcher initialized");

    let conversations = ConversationService::new(
        conversation_repo.clone(),
        inbox_repo,
        contact_repo,
        dispatcher.clone(),
        clock.clone(),
    );
    let messages = MessageService::new(conversation_repo, dispatcher.clone(), clock);

    App {
        config: config.clone(),
        store,
        dispatcher,
        conversations,
        messages,
    }
}
