use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::{RoomMeta, CONNECTED_FIELD, MAX_MEMBERS};
use crate::ids::IdGenerator;
use crate::lifecycle::{LifecycleManager, RoomKeys};
use crate::shared::AppError;
use crate::store::{CappedAppend, Store};

/// Result of attempting to append a member to a room
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppendMemberResult {
    /// Token appended, returns the new member count
    Appended(usize),
    /// Token was already a member, nothing changed
    AlreadyMember,
    /// Room is at capacity
    RoomFull,
    /// Room does not exist (never created or expired)
    RoomNotFound,
}

/// Room registry: the sole writer of room metadata
pub struct RoomRegistry {
    store: Arc<dyn Store>,
    ids: Arc<dyn IdGenerator>,
    lifecycle: LifecycleManager,
}

impl RoomRegistry {
    pub fn new(
        store: Arc<dyn Store>,
        ids: Arc<dyn IdGenerator>,
        lifecycle: LifecycleManager,
    ) -> Self {
        Self {
            store,
            ids,
            lifecycle,
        }
    }

    /// Creates a room with empty membership and the initial TTL, returning its id
    #[instrument(skip(self))]
    pub async fn create_room(&self) -> Result<String, AppError> {
        let room_id = self.ids.room_id();
        let meta = RoomMeta::new(Utc::now().timestamp_millis());
        let keys = RoomKeys::for_room(&room_id);
        let ttl = self.lifecycle.room_ttl();

        self.store
            .hset_with_ttl(&keys.meta, &meta.to_fields()?, ttl)
            .await?;

        info!(room_id = %room_id, ttl_secs = ttl.as_secs(), "Room created");
        Ok(room_id)
    }

    #[instrument(skip(self))]
    pub async fn exists(&self, room_id: &str) -> Result<bool, AppError> {
        let keys = RoomKeys::for_room(room_id);
        self.store.exists(&keys.meta).await
    }

    /// Returns the room's metadata, or None when it does not exist
    #[instrument(skip(self))]
    pub async fn get_membership(&self, room_id: &str) -> Result<Option<RoomMeta>, AppError> {
        let keys = RoomKeys::for_room(room_id);

        match self.store.hgetall(&keys.meta).await? {
            Some(fields) => {
                let meta = RoomMeta::from_fields(&fields)?;
                debug!(room_id = %room_id, members = meta.connected.len(), "Room found");
                Ok(Some(meta))
            }
            None => {
                debug!(room_id = %room_id, "Room not found");
                Ok(None)
            }
        }
    }

    /// Atomically appends a token to the room's membership
    ///
    /// The capacity check and the append happen in one store operation, so
    /// concurrent joiners can never push the room past its cap.
    #[instrument(skip(self, token))]
    pub async fn append_member(
        &self,
        room_id: &str,
        token: &str,
    ) -> Result<AppendMemberResult, AppError> {
        let keys = RoomKeys::for_room(room_id);

        let result = match self
            .store
            .append_capped(&keys.meta, CONNECTED_FIELD, token, MAX_MEMBERS)
            .await?
        {
            CappedAppend::Appended { len } => AppendMemberResult::Appended(len),
            CappedAppend::AlreadyPresent => AppendMemberResult::AlreadyMember,
            CappedAppend::Full => AppendMemberResult::RoomFull,
            CappedAppend::Missing => AppendMemberResult::RoomNotFound,
        };

        match &result {
            AppendMemberResult::Appended(count) => {
                info!(room_id = %room_id, member_count = count, "Member appended to room");
            }
            AppendMemberResult::RoomFull => {
                warn!(room_id = %room_id, "Append rejected, room is full");
            }
            other => debug!(room_id = %room_id, result = ?other, "Append did not change room"),
        }

        Ok(result)
    }
}
