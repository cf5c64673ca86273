//! UseCase 層のエラー定義

use thiserror::Error;

use crate::domain::{RoomId, StoreError, ValueObjectError};

/// Failure of a chat operation.
///
/// Every variant maps to a user-visible message through [`ChatError::user_message`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ChatError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Connection is not an authenticated admin")]
    Unauthorized,

    #[error("Invalid message: {0}")]
    Validation(#[from] ValueObjectError),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Durable store call '{operation}' failed: {source}")]
    Storage {
        operation: &'static str,
        source: StoreError,
    },

    #[error("No free room code found after {0} attempts")]
    CollisionExhausted(usize),

    #[error("Messages of room {room_id} were deleted but the room record was not: {source}")]
    PartialDelete { room_id: RoomId, source: StoreError },
}

impl ChatError {
    pub(crate) fn storage(operation: &'static str, source: StoreError) -> Self {
        Self::Storage { operation, source }
    }

    /// Message shown to the client in a failure acknowledgement or notice
    pub fn user_message(&self) -> String {
        match self {
            Self::RoomNotFound => "Room not found.".to_string(),
            Self::Unauthorized => "Unauthorized.".to_string(),
            Self::Validation(_) => "Invalid message content or length.".to_string(),
            Self::RateLimited => "You are sending messages too fast. Please wait.".to_string(),
            Self::Storage { operation, .. } => match *operation {
                "room_exists" | "insert_room" => "Failed to create room in database.",
                "recent_messages" => "Failed to load messages from database.",
                "insert_message" => "Failed to send message (database error).",
                "list_rooms" => "Failed to fetch rooms from database.",
                "delete_messages" => "Failed to delete room messages in database.",
                _ => "Database error.",
            }
            .to_string(),
            Self::CollisionExhausted(_) => {
                "Could not allocate a room code. Please try again.".to_string()
            }
            Self::PartialDelete { .. } => "Failed to delete room in database.".to_string(),
        }
    }
}
