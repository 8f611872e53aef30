use axum::{
    http::Uri,
    middleware,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::debug;

use crate::shared::{AppError, AppState};
use crate::{admission, messages, realtime, room};

/// Builds the HTTP surface
pub fn build_router(state: AppState) -> Router {
    // Routes that need a verified { roomId, token } pair
    let authenticated = Router::new()
        .route(
            "/messages",
            post(messages::send_message).get(messages::list_messages),
        )
        .route("/room/ttl", get(room::room_ttl))
        .route("/realtime", get(realtime::realtime_handler))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            admission::room_auth,
        ));

    Router::new()
        .route("/", get(home))
        .route("/room/create", post(room::create_room))
        .route("/room/:room_id", get(admission::enter_room))
        .merge(authenticated)
        .fallback(fallback)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Neutral entry point that rejected entrants are redirected to
async fn home() -> &'static str {
    "ghostroom: create a room with POST /room/create"
}

/// Unknown room paths go home, everything else is a plain 404
async fn fallback(uri: Uri) -> Response {
    if uri.path() == "/room" || uri.path().starts_with("/room/") {
        debug!(path = %uri.path(), "Malformed room path, redirecting home");
        return Redirect::temporary("/").into_response();
    }

    AppError::NotFound(format!("No route for {}", uri.path())).into_response()
}
