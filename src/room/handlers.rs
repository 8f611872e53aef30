use axum::{extract::State, Extension, Json};
use tracing::{info, instrument, warn};

use super::types::{CreateRoomResponse, RoomTtlResponse};
use crate::admission::RoomAuth;
use crate::shared::{AppError, AppState};

/// HTTP handler for creating a new room
///
/// POST /room/create
/// Returns the generated room id
#[instrument(name = "create_room", skip(state))]
pub async fn create_room(
    State(state): State<AppState>,
) -> Result<Json<CreateRoomResponse>, AppError> {
    let room_id = state.registry.create_room().await?;

    info!(room_id = %room_id, "Room created successfully");

    Ok(Json(CreateRoomResponse { room_id }))
}

/// HTTP handler for the room's remaining lifetime
///
/// GET /room/ttl?roomId=<id>
#[instrument(name = "room_ttl", skip(state, auth), fields(room_id = %auth.room_id))]
pub async fn room_ttl(
    State(state): State<AppState>,
    Extension(auth): Extension<RoomAuth>,
) -> Result<Json<RoomTtlResponse>, AppError> {
    let remaining = state.lifecycle.remaining(&auth.room_id).await?;

    match remaining.as_secs() {
        Some(ttl) => Ok(Json(RoomTtlResponse { ttl })),
        None => {
            warn!(room_id = %auth.room_id, ttl = ?remaining, "Room has no remaining lifetime");
            Err(AppError::NotFound("Room does not exist".to_string()))
        }
    }
}
