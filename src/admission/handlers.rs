use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use tracing::{info, instrument, warn};

use super::{
    controller::Admission,
    cookie::{membership_cookie, token_from_headers},
    types::RoomEntryResponse,
};
use crate::shared::{AppError, AppState};

const MAX_ROOM_ID_LEN: usize = 64;

/// Room ids are short runs of ASCII alphanumerics, `-` or `_`
pub fn is_well_formed_room_id(room_id: &str) -> bool {
    !room_id.is_empty()
        && room_id.len() <= MAX_ROOM_ID_LEN
        && room_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}

/// HTTP handler for entering a room
///
/// GET /room/:room_id
/// Admits the caller or redirects to the entry point with a reason code.
/// First-time entrants receive their membership token as a cookie.
#[instrument(name = "enter_room", skip(state, headers))]
pub async fn enter_room(
    State(state): State<AppState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    if !is_well_formed_room_id(&room_id) {
        warn!("Malformed room id, redirecting home");
        return Ok(Redirect::temporary("/").into_response());
    }

    let presented = token_from_headers(&headers);

    let (token, issued) = match state.admission.admit(&room_id, presented.as_deref()).await? {
        Admission::Admitted { token, issued } => (token, issued),
        Admission::Rejected(rejection) => {
            info!(room_id = %room_id, reason = %rejection, "Room entry rejected");
            return Ok(Redirect::temporary(&rejection.redirect_target()).into_response());
        }
    };

    let ttl = state.lifecycle.remaining(&room_id).await?.as_secs();
    let mut response = Json(RoomEntryResponse {
        room_id: room_id.clone(),
        ttl,
    })
    .into_response();

    if issued {
        let cookie = membership_cookie(&token, state.config.secure_cookies);
        let value = HeaderValue::from_str(&cookie).map_err(|e| {
            warn!(error = %e, "Membership cookie is not a valid header value");
            AppError::Internal
        })?;
        response.headers_mut().insert(header::SET_COOKIE, value);
    }

    info!(room_id = %room_id, issued, "Room entered");
    Ok(response)
}
