// Public API - what other modules can use
pub use handlers::{create_room, room_ttl};
pub use repository::{AppendMemberResult, RoomRegistry};

// Internal modules
mod handlers;
pub mod models;
pub mod repository;
pub mod types;
