use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::models::{Message, StoredMessage};
use crate::admission::RoomAuth;
use crate::event::{Broadcaster, RealtimeEvent};
use crate::ids::IdGenerator;
use crate::lifecycle::{LifecycleManager, RoomKeys};
use crate::room::RoomRegistry;
use crate::shared::AppError;
use crate::store::Store;

/// Persists and broadcasts messages for authenticated room members
///
/// Persistence and broadcast are not transactional. A message that was
/// stored but failed to broadcast is reported as a failed send and stays in
/// the log; it can only be recovered through the history read.
pub struct MessageRelay {
    store: Arc<dyn Store>,
    registry: Arc<RoomRegistry>,
    broadcaster: Arc<dyn Broadcaster>,
    ids: Arc<dyn IdGenerator>,
    lifecycle: LifecycleManager,
}

impl MessageRelay {
    pub fn new(
        store: Arc<dyn Store>,
        registry: Arc<RoomRegistry>,
        broadcaster: Arc<dyn Broadcaster>,
        ids: Arc<dyn IdGenerator>,
        lifecycle: LifecycleManager,
    ) -> Self {
        Self {
            store,
            registry,
            broadcaster,
            ids,
            lifecycle,
        }
    }

    /// Relays a message from `auth`'s member to the room
    ///
    /// Fails with NotFound, persisting and broadcasting nothing, when the room
    /// no longer exists.
    #[instrument(skip(self, auth, sender, text), fields(room_id = %auth.room_id))]
    pub async fn send(
        &self,
        auth: &RoomAuth,
        sender: String,
        text: String,
    ) -> Result<Message, AppError> {
        if !self.registry.exists(&auth.room_id).await? {
            warn!("Rejected message for missing room");
            return Err(AppError::NotFound("Room does not exist".to_string()));
        }

        let message = Message {
            id: self.ids.message_id(),
            sender,
            text,
            timestamp: Utc::now().timestamp_millis(),
            room_id: auth.room_id.clone(),
        };

        let stored = StoredMessage {
            message: message.clone(),
            token: auth.token.clone(),
        };
        let encoded = serde_json::to_string(&stored).map_err(|e| {
            warn!(error = %e, "Failed to encode message");
            AppError::Internal
        })?;

        let keys = RoomKeys::for_room(&auth.room_id);
        let log_len = self.store.rpush(&keys.messages, encoded).await?;
        debug!(message_id = %message.id, log_len, "Message persisted");

        // Synchronize before broadcasting so a failed broadcast can never
        // leave a log without an expiry behind
        self.lifecycle.sync_dependents(&auth.room_id).await?;

        let receivers = self
            .broadcaster
            .emit(&auth.room_id, RealtimeEvent::ChatMessage(message.clone()))
            .await
            .inspect_err(|e| {
                warn!(message_id = %message.id, error = %e, "Message persisted but not broadcast");
            })?;

        info!(message_id = %message.id, receivers, "Message relayed");
        Ok(message)
    }

    /// Returns the room's message log in send order, without attribution tokens
    ///
    /// Room existence is not re-checked here; an expired room simply has no log.
    #[instrument(skip(self))]
    pub async fn history(&self, room_id: &str) -> Result<Vec<Message>, AppError> {
        let keys = RoomKeys::for_room(room_id);
        let raw = self.store.lrange(&keys.messages).await?;

        let mut messages = Vec::with_capacity(raw.len());
        for entry in raw {
            match serde_json::from_str::<StoredMessage>(&entry) {
                Ok(stored) => messages.push(stored.into_public()),
                Err(e) => warn!(room_id = %room_id, error = %e, "Skipping malformed log entry"),
            }
        }

        debug!(room_id = %room_id, count = messages.len(), "Message history loaded");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::admission::Admission;
    use crate::shared::test_utils::{AppStateBuilder, SequentialIdGenerator};
    use crate::shared::AppState;
    use crate::store::{InMemoryStore, KeyTtl};
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::broadcast;

    /// Broadcaster whose transport is always down
    struct UnreachableBroadcaster;

    #[async_trait]
    impl Broadcaster for UnreachableBroadcaster {
        async fn emit(&self, _room_id: &str, _event: RealtimeEvent) -> Result<usize, AppError> {
            Err(AppError::Broadcast("connection refused".to_string()))
        }

        async fn subscribe(&self, _room_id: &str) -> broadcast::Receiver<RealtimeEvent> {
            broadcast::channel(1).1
        }
    }

    async fn member_of_new_room(state: &AppState) -> RoomAuth {
        let room_id = state.registry.create_room().await.unwrap();
        match state.admission.admit(&room_id, None).await.unwrap() {
            Admission::Admitted { token, .. } => RoomAuth { room_id, token },
            other => panic!("expected admission, got {other:?}"),
        }
    }

    async fn stored_log(store: &InMemoryStore, room_id: &str) -> Vec<StoredMessage> {
        store
            .lrange(&format!("messages:{room_id}"))
            .await
            .unwrap()
            .iter()
            .map(|raw| serde_json::from_str(raw).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_send_persists_and_broadcasts() {
        let store = Arc::new(InMemoryStore::new());
        let state = AppStateBuilder::new()
            .with_store(store.clone())
            .with_ids(Arc::new(SequentialIdGenerator::new()))
            .build();
        let auth = member_of_new_room(&state).await;
        let mut listener = state.broadcaster.subscribe(&auth.room_id).await;

        let sent = state
            .relay
            .send(&auth, "alice".to_string(), "hi".to_string())
            .await
            .unwrap();

        assert_eq!(sent.sender, "alice");
        assert_eq!(sent.text, "hi");
        assert_eq!(sent.room_id, auth.room_id);
        assert_eq!(sent.id, "msg3");
        assert!(sent.timestamp > 0);

        let log = stored_log(&store, &auth.room_id).await;
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].message, sent);
        assert_eq!(log[0].token, auth.token);

        assert_eq!(
            listener.recv().await.unwrap(),
            RealtimeEvent::ChatMessage(sent)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_synchronizes_log_ttl_with_room() {
        let store = Arc::new(InMemoryStore::new());
        let state = AppStateBuilder::new().with_store(store.clone()).build();
        let auth = member_of_new_room(&state).await;

        tokio::time::advance(Duration::from_secs(120)).await;
        state
            .relay
            .send(&auth, "alice".to_string(), "hi".to_string())
            .await
            .unwrap();

        let room_ttl = store.ttl(&format!("meta:{}", auth.room_id)).await.unwrap();
        let log_ttl = store
            .ttl(&format!("messages:{}", auth.room_id))
            .await
            .unwrap();
        assert_eq!(room_ttl, KeyTtl::Remaining(Duration::from_secs(480)));
        assert_eq!(log_ttl, room_ttl);
    }

    #[tokio::test]
    async fn test_send_to_missing_room_changes_nothing() {
        let store = Arc::new(InMemoryStore::new());
        let state = AppStateBuilder::new().with_store(store.clone()).build();
        let auth = RoomAuth {
            room_id: "ghost".to_string(),
            token: "token".to_string(),
        };
        let mut listener = state.broadcaster.subscribe("ghost").await;

        let result = state
            .relay
            .send(&auth, "alice".to_string(), "hi".to_string())
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(store.lrange("messages:ghost").await.unwrap().is_empty());
        assert!(matches!(
            listener.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_after_expiry_is_not_found() {
        let state = AppStateBuilder::new().build();
        let auth = member_of_new_room(&state).await;

        tokio::time::advance(Duration::from_secs(600)).await;

        let result = state
            .relay
            .send(&auth, "alice".to_string(), "too late".to_string())
            .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_broadcast_failure_surfaces_but_keeps_log() {
        let store = Arc::new(InMemoryStore::new());
        let state = AppStateBuilder::new()
            .with_store(store.clone())
            .with_broadcaster(Arc::new(UnreachableBroadcaster))
            .build();
        let auth = member_of_new_room(&state).await;

        let result = state
            .relay
            .send(&auth, "alice".to_string(), "hi".to_string())
            .await;

        assert!(matches!(result, Err(AppError::Broadcast(_))));
        // No rollback: the message stays, with the room's expiry
        assert_eq!(stored_log(&store, &auth.room_id).await.len(), 1);
        assert!(matches!(
            store
                .ttl(&format!("messages:{}", auth.room_id))
                .await
                .unwrap(),
            KeyTtl::Remaining(_)
        ));
    }

    #[tokio::test]
    async fn test_history_keeps_order_and_strips_tokens() {
        let state = AppStateBuilder::new().build();
        let auth = member_of_new_room(&state).await;

        for text in ["one", "two", "three"] {
            state
                .relay
                .send(&auth, "alice".to_string(), text.to_string())
                .await
                .unwrap();
        }

        let history = state.relay.history(&auth.room_id).await.unwrap();
        let texts: Vec<_> = history.iter().map(|m| m.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);

        let json = serde_json::to_string(&history).unwrap();
        assert!(!json.contains(&auth.token));
    }
}
