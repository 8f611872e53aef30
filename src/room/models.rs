use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::shared::AppError;

/// Maximum number of participants per room
pub const MAX_MEMBERS: usize = 2;

pub const CONNECTED_FIELD: &str = "connected";
pub const CREATED_AT_FIELD: &str = "createdAt";

/// Room metadata as stored in the `meta:<room_id>` hash
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMeta {
    /// Membership tokens in join order
    pub connected: Vec<String>,
    /// Creation time, milliseconds since the Unix epoch
    pub created_at: i64,
}

impl RoomMeta {
    pub fn new(created_at: i64) -> Self {
        Self {
            connected: Vec::new(),
            created_at,
        }
    }

    /// Check if room is at capacity
    pub fn is_full(&self) -> bool {
        self.connected.len() >= MAX_MEMBERS
    }

    /// Check if a token belongs to a member of this room
    pub fn has_member(&self, token: &str) -> bool {
        self.connected.iter().any(|t| t == token)
    }

    /// Encodes the metadata as hash fields; the token list is a JSON array
    pub fn to_fields(&self) -> Result<Vec<(&'static str, String)>, AppError> {
        let connected = serde_json::to_string(&self.connected).map_err(|e| {
            tracing::warn!(error = %e, "Failed to encode room membership");
            AppError::Internal
        })?;

        Ok(vec![
            (CONNECTED_FIELD, connected),
            (CREATED_AT_FIELD, self.created_at.to_string()),
        ])
    }

    /// Decodes hash fields written by `to_fields` (or by the atomic append)
    pub fn from_fields(fields: &HashMap<String, String>) -> Result<Self, AppError> {
        let connected = match fields.get(CONNECTED_FIELD).map(String::as_str) {
            // An empty Lua table encodes as an object
            None | Some("") | Some("{}") => Vec::new(),
            Some(raw) => serde_json::from_str(raw).map_err(|e| {
                AppError::Store(format!("Malformed room membership: {e}"))
            })?,
        };

        let created_at = fields
            .get(CREATED_AT_FIELD)
            .map(|raw| raw.parse::<i64>())
            .transpose()
            .map_err(|e| AppError::Store(format!("Malformed room creation time: {e}")))?
            .unwrap_or_default();

        Ok(Self {
            connected,
            created_at,
        })
    }
}
