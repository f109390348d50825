pub mod dispatcher;
pub mod listeners;
pub mod services;

pub use dispatcher::EventDispatcher;
