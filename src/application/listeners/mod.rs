pub mod hook_execution;
pub mod reporting_event;

pub use hook_execution::{HookExecutionEngine, HookKind, DEFAULT_SUPPRESSION_WINDOW_SECS};
pub use reporting_event::ReportingEventRecorder;
