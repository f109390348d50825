use crate::domain::entities::{ReportingEvent, ReportingEventName};
use crate::domain::errors::DomainResult;

#[async_trait::async_trait]
pub trait ReportingEventRepository: Send + Sync {
    async fn create_reporting_event(&self, event: &ReportingEvent) -> DomainResult<()>;

    /// Insert a bot handoff record unless the conversation already has one
    /// that no `first_response` record has consumed yet. The check and the
    /// insert happen atomically. Returns whether the record was inserted.
    async fn create_bot_handoff_if_unconsumed(&self, event: &ReportingEvent) -> DomainResult<bool>;

    /// Most recent handoff record of the conversation not yet followed by a
    /// `first_response` record.
    async fn find_unconsumed_bot_handoff(
        &self,
        conversation_id: &str,
    ) -> DomainResult<Option<ReportingEvent>>;

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
        name: Option<ReportingEventName>,
    ) -> DomainResult<Vec<ReportingEvent>>;
}
