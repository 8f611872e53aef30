use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::{events::RealtimeEvent, Broadcaster};
use crate::shared::AppError;

const DEFAULT_ROOM_CAPACITY: usize = 100;

/// In-process broadcaster with one broadcast channel per room
#[derive(Debug, Clone)]
pub struct EventBus {
    /// Room-specific event channels: room_id -> sender
    room_channels: Arc<RwLock<HashMap<String, broadcast::Sender<RealtimeEvent>>>>,
    capacity: usize,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_ROOM_CAPACITY)
    }

    /// Creates an event bus whose room channels buffer `capacity` events per listener
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            room_channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    /// Number of rooms that currently have a channel
    pub async fn channel_count(&self) -> usize {
        self.room_channels.read().await.len()
    }
}

#[async_trait]
impl Broadcaster for EventBus {
    async fn emit(&self, room_id: &str, event: RealtimeEvent) -> Result<usize, AppError> {
        let room_channels = self.room_channels.read().await;

        // No channel means nobody ever listened; there is no replay, so drop it
        let Some(sender) = room_channels.get(room_id) else {
            debug!(room_id = %room_id, event = event.name(), "No listeners for room event");
            return Ok(0);
        };

        match sender.send(event) {
            Ok(receiver_count) => {
                debug!(
                    room_id = %room_id,
                    receivers = receiver_count,
                    "Room event emitted"
                );
                Ok(receiver_count)
            }
            Err(_) => {
                debug!(room_id = %room_id, "Room event emitted with no receivers");
                Ok(0)
            }
        }
    }

    async fn subscribe(&self, room_id: &str) -> broadcast::Receiver<RealtimeEvent> {
        {
            let room_channels = self.room_channels.read().await;
            if let Some(sender) = room_channels.get(room_id) {
                return sender.subscribe();
            }
        }

        let mut room_channels = self.room_channels.write().await;

        // Channels of rooms whose listeners all left are dead weight
        room_channels.retain(|_, sender| sender.receiver_count() > 0);

        // Another subscriber may have created it while we waited for the lock
        if let Some(sender) = room_channels.get(room_id) {
            return sender.subscribe();
        }

        debug!(room_id = %room_id, "Creating new room channel for subscription");
        let (sender, receiver) = broadcast::channel(self.capacity);
        room_channels.insert(room_id.to_string(), sender);
        receiver
    }
}
