pub mod logging_response;

pub use logging_response::LoggingResponse;
