use serde::{Deserialize, Serialize};

use super::models::Message;
use crate::shared::AppError;

pub const MAX_SENDER_LEN: usize = 100;
pub const MAX_TEXT_LEN: usize = 1000;

/// Request payload for sending a message
#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    pub sender: String,
    pub text: String,
}

impl SendMessageRequest {
    /// Enforces the field length limits, counted in UTF-16 code units so
    /// browser clients and the server agree on what fits
    pub fn validate(&self) -> Result<(), AppError> {
        if utf16_len(&self.sender) > MAX_SENDER_LEN {
            return Err(AppError::Validation(format!(
                "sender must be at most {MAX_SENDER_LEN} characters"
            )));
        }
        if utf16_len(&self.text) > MAX_TEXT_LEN {
            return Err(AppError::Validation(format!(
                "text must be at most {MAX_TEXT_LEN} characters"
            )));
        }
        Ok(())
    }
}

fn utf16_len(value: &str) -> usize {
    value.encode_utf16().count()
}

/// Response for the message history of a room
#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}
