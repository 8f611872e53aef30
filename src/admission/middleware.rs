use axum::{
    extract::{Query, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::{debug, instrument, warn};

use super::{
    cookie::token_from_headers,
    types::{RoomAuth, RoomQuery},
};
use crate::shared::{AppError, AppState};

/// Room authentication middleware - checks the membership cookie against the
/// room named by `?roomId=` and adds `RoomAuth` to the request.
/// Usage: .route_layer(middleware::from_fn_with_state(app_state.clone(), admission::room_auth))
/// Handlers can then extract Extension(auth): Extension<RoomAuth>.
#[instrument(skip_all, fields(room_id = %query.room_id))]
pub async fn room_auth(
    State(state): State<AppState>,
    Query(query): Query<RoomQuery>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = token_from_headers(req.headers()).ok_or_else(|| {
        warn!("Missing membership cookie");
        AppError::Unauthorized("Missing auth token".to_string())
    })?;

    let meta = state
        .registry
        .get_membership(&query.room_id)
        .await?
        .ok_or_else(|| {
            warn!("Room not found during authentication");
            AppError::Unauthorized("Room does not exist".to_string())
        })?;

    if !meta.has_member(&token) {
        warn!("Token is not a member of the room");
        return Err(AppError::Unauthorized("Invalid auth token".to_string()));
    }

    debug!("Room authentication successful");

    req.extensions_mut().insert(RoomAuth {
        room_id: query.room_id,
        token,
    });

    Ok(next.run(req).await)
}
