//! Domain errors.

use thiserror::Error;

/// Value object validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValueObjectError {
    #[error("Invalid room code '{0}'")]
    InvalidRoomId(String),

    #[error("Message must not be empty")]
    EmptyMessage,

    #[error("Message is too long ({length} > {max} characters)")]
    MessageTooLong { length: usize, max: usize },
}

/// Room entity errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RoomError {
    #[error("Connection '{0}' is already a participant of this room")]
    DuplicateParticipant(String),

    #[error("Room '{0}' has been closed")]
    RoomClosed(String),
}

/// Durable store errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("Request to durable store failed: {0}")]
    Request(String),

    #[error("Durable store returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Row already exists")]
    Conflict,

    #[error("Failed to decode durable store response: {0}")]
    Decode(String),

    #[error("Durable store call '{0}' timed out")]
    Timeout(&'static str),
}

/// Message push errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MessagePushError {
    #[error("Client '{0}' is not connected")]
    ClientNotFound(String),

    #[error("Failed to push message: {0}")]
    PushFailed(String),
}
