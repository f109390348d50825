pub mod automated_response;
pub mod clock;
pub mod contact_repository;
pub mod conversation_repository;
pub mod event_listener;
pub mod inbox_repository;
pub mod reporting_event_repository;

pub use automated_response::AutomatedResponse;
pub use clock::{Clock, ManualClock, SystemClock};
pub use contact_repository::ContactRepository;
pub use conversation_repository::ConversationRepository;
pub use event_listener::EventListener;
pub use inbox_repository::InboxRepository;
pub use reporting_event_repository::ReportingEventRepository;
