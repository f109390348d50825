use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::events::{DomainEvent, EventName};
use crate::domain::ports::EventListener;

/// Routes domain events to the listeners subscribed to their name.
///
/// Listeners run one after another in registration order and `dispatch`
/// returns only after the last one finished. A listener error is logged and
/// counted, then the next listener runs. Panics propagate to the caller.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: HashMap<EventName, Vec<Arc<dyn EventListener>>>,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, name: EventName, listener: Arc<dyn EventListener>) {
        tracing::debug!("Subscribing listener {} to {}", listener.name(), name);
        self.listeners.entry(name).or_default().push(listener);
    }

    /// Subscribe `listener` to every event it declares interest in.
    pub fn register(&mut self, listener: Arc<dyn EventListener>) {
        for name in listener.subscriptions() {
            self.subscribe(*name, listener.clone());
        }
    }

    pub fn listener_count(&self, name: EventName) -> usize {
        self.listeners.get(&name).map_or(0, Vec::len)
    }

    pub async fn dispatch(&self, event: &DomainEvent) {
        metrics::counter!("convopulse_events_dispatched_total", "event" => event.name.as_str())
            .increment(1);

        let Some(listeners) = self.listeners.get(&event.name) else {
            tracing::trace!("No listeners for {}", event.name);
            return;
        };

        for listener in listeners {
            if let Err(e) = listener.handle(event).await {
                tracing::error!(
                    "Listener {} failed on {} for conversation {:?}: {}",
                    listener.name(),
                    event.name,
                    event.conversation_id(),
                    e
                );
                metrics::counter!(
                    "convopulse_listener_failures_total",
                    "listener" => listener.name(),
                    "event" => event.name.as_str()
                )
                .increment(1);
            }
        }
    }

    /// Dispatch a batch in order, each event fully handled before the next.
    pub async fn dispatch_all(&self, events: &[DomainEvent]) {
        for event in events {
            self.dispatch(event).await;
        }
    }
}
