//! Conversion logic between domain entities and DTOs.

use hushroom_shared::time::timestamp_to_rfc3339;

use crate::domain::{ChatMessage, DisplayName, RoomSummary};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&ChatMessage> for dto::HistoryEntry {
    fn from(model: &ChatMessage) -> Self {
        Self {
            username: model.author.as_str().to_string(),
            message: model.content.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(model.timestamp.value()),
        }
    }
}

impl From<&ChatMessage> for dto::NewMessagePayload {
    fn from(model: &ChatMessage) -> Self {
        Self {
            username: model.author.as_str().to_string(),
            message: model.content.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(model.timestamp.value()),
            id: model.id.as_ref().map(|id| id.as_str().to_string()),
        }
    }
}

impl From<&RoomSummary> for dto::RoomSummaryDto {
    fn from(model: &RoomSummary) -> Self {
        Self {
            id: model.record.id.as_str().to_string(),
            user_count: model.participant_count,
            created_at: timestamp_to_rfc3339(model.record.created_at.value()),
            last_activity: timestamp_to_rfc3339(model.record.last_activity.value()),
        }
    }
}

/// Display names as wire strings
pub fn display_names(names: &[DisplayName]) -> Vec<String> {
    names.iter().map(|name| name.as_str().to_string()).collect()
}
