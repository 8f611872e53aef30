// Public API - what other modules can use
pub use handlers::{list_messages, send_message};
pub use relay::MessageRelay;

// Internal modules
mod handlers;
pub mod models;
mod relay;
pub mod types;
