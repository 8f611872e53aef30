// Real-time delivery of room events
//
// The broadcaster publishes to one channel per room. Delivery is
// fire-and-forget: listeners only see events emitted while they are subscribed.

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::RealtimeEvent;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::shared::AppError;

// Internal modules
mod bus;
mod events;

/// Publish/subscribe transport scoped to room channels
#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Publishes an event to the room's channel, returning how many listeners received it
    async fn emit(&self, room_id: &str, event: RealtimeEvent) -> Result<usize, AppError>;

    /// Subscribes to every event emitted to the room from now on
    async fn subscribe(&self, room_id: &str) -> broadcast::Receiver<RealtimeEvent>;
}
