pub mod business_hours;
pub mod state_machine;

pub use business_hours::{duration_in_business_hours, is_open_at, wall_clock_seconds};
pub use state_machine::TransitionContext;
