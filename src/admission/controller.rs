use std::sync::Arc;
use strum_macros::Display;
use tracing::{debug, info, instrument, warn};

use crate::ids::IdGenerator;
use crate::room::{AppendMemberResult, RoomRegistry};
use crate::shared::AppError;

/// Why a participant was turned away. Displays as the redirect reason code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum Rejection {
    /// Room never existed or has expired; the two are not distinguished
    RoomNotFound,
    /// Room already has two members
    RoomFull,
}

impl Rejection {
    /// Where a rejected participant is sent
    pub fn redirect_target(&self) -> String {
        format!("/?error={self}")
    }
}

/// Outcome of an admission attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Admission {
    /// Participant may enter; `issued` is true when `token` was minted now
    Admitted { token: String, issued: bool },
    Rejected(Rejection),
}

/// Gates room entry and mints membership tokens
pub struct AdmissionController {
    registry: Arc<RoomRegistry>,
    ids: Arc<dyn IdGenerator>,
}

impl AdmissionController {
    pub fn new(registry: Arc<RoomRegistry>, ids: Arc<dyn IdGenerator>) -> Self {
        Self { registry, ids }
    }

    /// Decides whether the caller may enter `room_id`
    ///
    /// A presented token that is already a member re-enters without any state
    /// change. Otherwise a fresh token is minted and appended atomically, so
    /// the two-member cap holds under concurrent joins.
    #[instrument(skip(self, presented_token))]
    pub async fn admit(
        &self,
        room_id: &str,
        presented_token: Option<&str>,
    ) -> Result<Admission, AppError> {
        let Some(meta) = self.registry.get_membership(room_id).await? else {
            info!(room_id = %room_id, "Admission rejected, room not found");
            return Ok(Admission::Rejected(Rejection::RoomNotFound));
        };

        if let Some(token) = presented_token.filter(|t| meta.has_member(t)) {
            debug!(room_id = %room_id, "Existing member re-entered room");
            return Ok(Admission::Admitted {
                token: token.to_string(),
                issued: false,
            });
        }

        if meta.is_full() {
            info!(room_id = %room_id, "Admission rejected, room is full");
            return Ok(Admission::Rejected(Rejection::RoomFull));
        }

        let token = self.ids.token();

        match self.registry.append_member(room_id, &token).await? {
            AppendMemberResult::Appended(member_count) => {
                info!(room_id = %room_id, member_count, "New member admitted");
                Ok(Admission::Admitted {
                    token,
                    issued: true,
                })
            }
            // Freshly minted tokens cannot already be present, but it is still a member
            AppendMemberResult::AlreadyMember => Ok(Admission::Admitted {
                token,
                issued: true,
            }),
            AppendMemberResult::RoomFull => {
                warn!(room_id = %room_id, "Lost admission race, room filled concurrently");
                Ok(Admission::Rejected(Rejection::RoomFull))
            }
            AppendMemberResult::RoomNotFound => {
                info!(room_id = %room_id, "Room expired during admission");
                Ok(Admission::Rejected(Rejection::RoomNotFound))
            }
        }
    }
}
