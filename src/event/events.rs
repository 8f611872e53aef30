use serde::{Deserialize, Serialize};
use strum_macros::IntoStaticStr;

use crate::messages::models::Message;

/// Events published on a room's real-time channel
///
/// Serialized as `{ "event": <name>, "data": <payload> }` so listeners can
/// dispatch on the event name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, IntoStaticStr)]
#[serde(tag = "event", content = "data")]
pub enum RealtimeEvent {
    /// A chat message was relayed to the room
    #[serde(rename = "chat.message")]
    #[strum(serialize = "chat.message")]
    ChatMessage(Message),
}

impl RealtimeEvent {
    /// Get the room_id associated with this event
    pub fn room_id(&self) -> &str {
        match self {
            RealtimeEvent::ChatMessage(message) => &message.room_id,
        }
    }

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        self.into()
    }
}
