// Public API - what other modules can use
pub use handler::realtime_handler;

// Internal modules
mod handler;
