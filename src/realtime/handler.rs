use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocketUpgrade},
        State,
    },
    response::Response,
    Extension,
};
use futures::{Sink, SinkExt, Stream, StreamExt};
use std::fmt::Display;
use std::time::Duration;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::admission::RoomAuth;
use crate::event::RealtimeEvent;
use crate::lifecycle::LifecycleManager;
use crate::shared::AppState;
use crate::store::KeyTtl;

/// How long to wait before re-checking a room whose expiry is unknown
const EXPIRY_RECHECK: Duration = Duration::from_secs(60);

/// WebSocket endpoint streaming a room's events to one listener
///
/// GET /realtime?roomId=<id>, authenticated by the membership cookie.
/// Events emitted before the socket subscribed are not replayed. The socket
/// is closed once the room expires.
#[instrument(name = "realtime", skip_all, fields(room_id = %auth.room_id))]
pub async fn realtime_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Extension(auth): Extension<RoomAuth>,
) -> Response {
    info!("Realtime connection requested");

    // Subscribe before upgrading so nothing sent after the handshake is missed
    let receiver = state.broadcaster.subscribe(&auth.room_id).await;
    let lifecycle = state.lifecycle.clone();

    ws.on_upgrade(move |socket| {
        let (sink, stream) = socket.split();
        forward_events(sink, stream, auth.room_id, receiver, lifecycle)
    })
}

/// Encodes an event as the JSON text frame clients receive
fn event_frame(event: &RealtimeEvent) -> Result<WsMessage, serde_json::Error> {
    serde_json::to_string(event).map(WsMessage::Text)
}

/// Time until the room should be checked for expiry, or None once it is gone
async fn time_left(lifecycle: &LifecycleManager, room_id: &str) -> Option<Duration> {
    match lifecycle.remaining(room_id).await {
        Ok(KeyTtl::Remaining(remaining)) => Some(remaining),
        Ok(KeyTtl::Missing) => None,
        Ok(KeyTtl::Persistent) => Some(EXPIRY_RECHECK),
        Err(e) => {
            warn!(room_id = %room_id, error = %e, "Could not read room expiry");
            Some(EXPIRY_RECHECK)
        }
    }
}

/// Forwards room events to the socket until either side goes away or the room expires
async fn forward_events<S, R>(
    mut sink: S,
    mut stream: R,
    room_id: String,
    mut events: broadcast::Receiver<RealtimeEvent>,
    lifecycle: LifecycleManager,
) where
    S: Sink<WsMessage> + Unpin,
    S::Error: Display,
    R: Stream<Item = Result<WsMessage, axum::Error>> + Unpin,
{
    info!(room_id = %room_id, "Realtime connection established");

    let Some(remaining) = time_left(&lifecycle, &room_id).await else {
        info!(room_id = %room_id, "Room already expired, closing realtime connection");
        let _ = sink.send(WsMessage::Close(None)).await;
        return;
    };
    let expiry = tokio::time::sleep(remaining);
    tokio::pin!(expiry);

    loop {
        tokio::select! {
            // Outbound: room events to the client
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let frame = match event_frame(&event) {
                            Ok(frame) => frame,
                            Err(e) => {
                                warn!(room_id = %room_id, error = %e, "Failed to encode event");
                                continue;
                            }
                        };
                        if let Err(e) = sink.send(frame).await {
                            debug!(room_id = %room_id, error = %e, "Client went away");
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(room_id = %room_id, skipped, "Listener lagged, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }

            // Inbound: only used to notice the client closing
            msg = stream.next() => {
                match msg {
                    Some(Ok(WsMessage::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(room_id = %room_id, error = %e, "WebSocket receive error");
                        break;
                    }
                }
            }

            // Room lifetime: its tokens die with it, so does the socket
            () = &mut expiry => {
                match time_left(&lifecycle, &room_id).await {
                    Some(remaining) => expiry.as_mut().reset(Instant::now() + remaining),
                    None => {
                        info!(room_id = %room_id, "Room expired, closing realtime connection");
                        break;
                    }
                }
            }
        }
    }

    let _ = sink.send(WsMessage::Close(None)).await;
    info!(room_id = %room_id, "Realtime connection closed");
}
