//! WebSocket event frames and payloads.
//!
//! Every frame is a JSON object `{"event": ..., "data": ..., "ack": ...}`.
//! Field names inside `data` are camelCase.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Event names
pub mod event {
    pub const CREATE_ROOM: &str = "create-room";
    pub const JOIN_ROOM: &str = "join-room";
    pub const SEND_MESSAGE: &str = "send-message";
    pub const TYPING: &str = "typing";
    pub const ADMIN_LOGIN: &str = "admin-login";
    pub const LIST_ROOMS: &str = "list-rooms";
    pub const DELETE_ROOM: &str = "delete-room";

    pub const NEW_MESSAGE: &str = "new-message";
    pub const RATE_LIMIT_EXCEEDED: &str = "rate-limit-exceeded";
    pub const MESSAGE_ERROR: &str = "message-error";
    pub const TYPING_INDICATOR: &str = "typing-indicator";
    pub const USER_JOINED: &str = "user-joined";
    pub const USER_LEFT: &str = "user-left";
    pub const ROOM_DELETED_USER_NOTIFY: &str = "room-deleted-user-notify";
    pub const ADMIN_AUTHENTICATED: &str = "admin-authenticated";
    pub const ACTIVE_ROOMS_LIST: &str = "active-rooms-list";
    pub const ROOM_DELETED_ADMIN_NOTIFY: &str = "room-deleted-admin-notify";
    pub const ROOM_CREATED_ADMIN_NOTIFY: &str = "room-created-admin-notify";
}

// ========================================
// Frames
// ========================================

/// Frame received from a client
#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub ack: Option<u64>,
}

/// Frame sent to a client (push, broadcast or acknowledgement)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboundFrame<T> {
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ack: Option<u64>,
    pub data: T,
}

impl<T: Serialize> OutboundFrame<T> {
    pub fn push(event: &str, data: T) -> Self {
        Self {
            event: event.to_string(),
            ack: None,
            data,
        }
    }

    pub fn reply(event: &str, ack: u64, data: T) -> Self {
        Self {
            event: event.to_string(),
            ack: Some(ack),
            data,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ========================================
// Client → Server payloads
// ========================================

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomRequest {
    pub room_id: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub room_id: String,
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingRequest {
    pub room_id: String,
    pub is_typing: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AdminLoginRequest {
    pub secret: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRoomRequest {
    pub room_id: String,
}

// ========================================
// Server → Client payloads
// ========================================

/// Generic `{success, message?}` acknowledgement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAck {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusAck {
    pub fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn ok_with(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomAck {
    pub success: bool,
    pub room_id: String,
}

/// One entry of the join-room history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub username: String,
    pub message: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinRoomAck {
    pub success: bool,
    pub username: String,
    pub messages: Vec<HistoryEntry>,
    pub active_users: Vec<String>,
}

/// `new-message` broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessagePayload {
    pub username: String,
    pub message: String,
    pub timestamp: String,
    pub id: Option<String>,
}

/// `{message}` notice (rate-limit-exceeded, message-error, room-deleted-user-notify)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticePayload {
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingIndicatorPayload {
    pub username: String,
    pub is_typing: bool,
}

/// `user-joined` / `user-left` broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresencePayload {
    pub username: String,
    pub active_users: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummaryDto {
    pub id: String,
    pub user_count: usize,
    pub created_at: String,
    pub last_activity: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListRoomsAck {
    pub success: bool,
    pub rooms: Vec<RoomSummaryDto>,
}

/// `active-rooms-list` push
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveRoomsListPayload {
    pub rooms: Vec<RoomSummaryDto>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminAuthenticatedPayload {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatedAdminPayload {
    pub room_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDeletedAdminPayload {
    pub room_id: String,
    pub message: String,
}
