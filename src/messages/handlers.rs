use axum::{extract::State, Extension, Json};
use tracing::{info, instrument};

use super::{
    models::Message,
    types::{MessagesResponse, SendMessageRequest},
};
use crate::admission::RoomAuth;
use crate::shared::{AppError, AppState};

/// HTTP handler for sending a message
///
/// POST /messages?roomId=<id>
/// Body: { "sender": ..., "text": ... }
#[instrument(name = "send_message", skip_all, fields(room_id = %auth.room_id))]
pub async fn send_message(
    State(state): State<AppState>,
    Extension(auth): Extension<RoomAuth>,
    Json(request): Json<SendMessageRequest>,
) -> Result<Json<Message>, AppError> {
    request.validate()?;

    let message = state.relay.send(&auth, request.sender, request.text).await?;

    info!(message_id = %message.id, "Message sent successfully");

    Ok(Json(message))
}

/// HTTP handler for reading a room's message history
///
/// GET /messages?roomId=<id>
#[instrument(name = "list_messages", skip_all, fields(room_id = %auth.room_id))]
pub async fn list_messages(
    State(state): State<AppState>,
    Extension(auth): Extension<RoomAuth>,
) -> Result<Json<MessagesResponse>, AppError> {
    let messages = state.relay.history(&auth.room_id).await?;

    info!(count = messages.len(), "Messages listed successfully");

    Ok(Json(MessagesResponse { messages }))
}
