use serde::{Deserialize, Serialize};

/// Response for room creation
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResponse {
    pub room_id: String,
}

/// Response for the remaining room lifetime, in seconds
#[derive(Debug, Serialize, Deserialize)]
pub struct RoomTtlResponse {
    pub ttl: u64,
}
