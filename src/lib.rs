// Library crate for the ephemeral two-party chat server
// This file exposes the public API for integration tests

pub mod admission;
pub mod config;
pub mod event;
pub mod ids;
pub mod lifecycle;
pub mod messages;
pub mod realtime;
pub mod room;
pub mod router;
pub mod shared;
pub mod store;

// Re-export commonly used types for easier access in tests
pub use admission::{Admission, AdmissionController, Rejection, RoomAuth};
pub use config::AppConfig;
pub use event::{Broadcaster, EventBus, RealtimeEvent};
pub use ids::{IdGenerator, RandomIdGenerator};
pub use lifecycle::{LifecycleManager, RoomKeys};
pub use messages::{models::Message, MessageRelay};
pub use room::{models::RoomMeta, RoomRegistry};
pub use router::build_router;
pub use shared::{AppError, AppState};
pub use store::{InMemoryStore, KeyTtl, RedisStore, Store};
