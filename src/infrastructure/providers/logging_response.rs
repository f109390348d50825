use async_trait::async_trait;

use crate::application::listeners::HookKind;
use crate::domain::entities::Conversation;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::ports::AutomatedResponse;

/// Stand-in responder that only logs. Template rendering and delivery live
/// outside this crate; wire a real responder in their place.
pub struct LoggingResponse {
    pub kind: HookKind,
    /// If true, simulate a delivery failure
    pub should_fail: bool,
}

impl LoggingResponse {
    pub fn new(kind: HookKind) -> Self {
        Self {
            kind,
            should_fail: false,
        }
    }

    pub fn new_failing(kind: HookKind) -> Self {
        Self {
            kind,
            should_fail: true,
        }
    }
}

#[async_trait]
impl AutomatedResponse for LoggingResponse {
    async fn apply(&self, conversation: &Conversation) -> DomainResult<bool> {
        if self.should_fail {
            return Err(DomainError::Internal(format!(
                "Simulated {} failure for conversation {}",
                self.kind, conversation.id
            )));
        }
        tracing::debug!(
            "Would send {} response to conversation {}",
            self.kind,
            conversation.id
        );
        Ok(true)
    }
}
