use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

use crate::shared::AppError;
use crate::store::{KeyTtl, Store};

/// Store keys owned by one room
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomKeys {
    /// Room metadata hash, the authoritative TTL holder
    pub meta: String,
    /// Ordered message log
    pub messages: String,
    /// Derived history
    pub history: String,
}

impl RoomKeys {
    pub fn for_room(room_id: &str) -> Self {
        Self {
            meta: format!("meta:{room_id}"),
            messages: format!("messages:{room_id}"),
            history: format!("history:{room_id}"),
        }
    }

    /// Keys whose lifetime follows the metadata key
    pub fn dependents(&self) -> [&str; 2] {
        [self.messages.as_str(), self.history.as_str()]
    }
}

/// Shared TTL discipline for every room-scoped key
///
/// The metadata key's TTL is the single source of truth. Dependent keys are
/// re-synchronized to whatever the room has left on every write, so nothing
/// in a room outlives the room itself.
#[derive(Clone)]
pub struct LifecycleManager {
    store: Arc<dyn Store>,
    room_ttl: Duration,
}

impl LifecycleManager {
    pub fn new(store: Arc<dyn Store>, room_ttl: Duration) -> Self {
        Self { store, room_ttl }
    }

    /// Lifetime given to a freshly created room
    pub fn room_ttl(&self) -> Duration {
        self.room_ttl
    }

    /// Remaining lifetime of the room
    #[instrument(skip(self))]
    pub async fn remaining(&self, room_id: &str) -> Result<KeyTtl, AppError> {
        let keys = RoomKeys::for_room(room_id);
        self.store.ttl(&keys.meta).await
    }

    /// Applies the room's remaining TTL to all dependent keys
    #[instrument(skip(self))]
    pub async fn sync_dependents(&self, room_id: &str) -> Result<KeyTtl, AppError> {
        let keys = RoomKeys::for_room(room_id);
        let ttl = self.store.copy_ttl(&keys.meta, &keys.dependents()).await?;

        match ttl {
            KeyTtl::Remaining(remaining) => {
                debug!(
                    room_id = %room_id,
                    remaining_ms = remaining.as_millis() as u64,
                    "Room-scoped keys synchronized"
                );
            }
            KeyTtl::Missing => {
                warn!(room_id = %room_id, "Room expired during write, dependent keys removed");
            }
            KeyTtl::Persistent => {
                warn!(room_id = %room_id, "Room metadata has no expiry, dependent keys untouched");
            }
        }

        Ok(ttl)
    }
}
