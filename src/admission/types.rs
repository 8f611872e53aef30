use serde::{Deserialize, Serialize};

/// Verified room context injected by the room auth middleware
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomAuth {
    pub room_id: String,
    pub token: String,
}

/// `?roomId=<id>` query carried by room-scoped API calls
#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    #[serde(rename = "roomId")]
    pub room_id: String,
}

/// Response for a successful room entry
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomEntryResponse {
    pub room_id: String,
    /// Remaining room lifetime in seconds
    pub ttl: Option<u64>,
}
