use serde::{Deserialize, Serialize};

/// A chat message as seen by room participants
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub sender: String,
    pub text: String,
    /// Milliseconds since the Unix epoch, assigned by the server
    pub timestamp: i64,
    pub room_id: String,
}

/// Message log entry: the public message plus the sender's token for attribution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMessage {
    #[serde(flatten)]
    pub message: Message,
    pub token: String,
}

impl StoredMessage {
    /// Drops the attribution token
    pub fn into_public(self) -> Message {
        self.message
    }
}
