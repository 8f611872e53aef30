// Room admission: who may enter a room, and proof that they did
//
// Entry mints a membership token, hands it to the client as an http-only
// cookie, and every room-scoped API call is checked against it.

// Public API - what other modules can use
pub use controller::{Admission, AdmissionController, Rejection};
pub use handlers::{enter_room, is_well_formed_room_id};
pub use middleware::room_auth;
pub use types::{RoomAuth, RoomQuery};

// Internal modules
mod controller;
pub mod cookie;
mod handlers;
mod middleware;
pub mod types;
