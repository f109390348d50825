pub mod contact;
pub mod conversation;
pub mod inbox;
pub mod message;
pub mod reporting_event;

pub use contact::*;
pub use conversation::*;
pub use inbox::*;
pub use message::*;
pub use reporting_event::*;
