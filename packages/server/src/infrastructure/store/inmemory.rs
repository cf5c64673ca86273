//! InMemory Room Store 実装
//!
//! 永続ストアの振る舞い（ID の一意性、メッセージ → ルームの外部キー制約）をプロセス内で再現する。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, MessageId, NewMessage, RoomId, RoomRecord, RoomStore, StoreError, Timestamp,
};

#[derive(Default)]
struct StoreState {
    rooms: HashMap<RoomId, RoomRecord>,
    messages: Vec<(RoomId, ChatMessage)>,
    next_message_id: u64,
}

/// インメモリ Room Store 実装
#[derive(Default)]
pub struct InMemoryRoomStore {
    state: Mutex<StoreState>,
}

impl InMemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored messages for a room
    pub async fn message_count(&self, room_id: &RoomId) -> usize {
        let state = self.state.lock().await;
        state.messages.iter().filter(|(id, _)| id == room_id).count()
    }
}

#[async_trait]
impl RoomStore for InMemoryRoomStore {
    async fn room_exists(&self, room_id: &RoomId) -> Result<bool, StoreError> {
        Ok(self.state.lock().await.rooms.contains_key(room_id))
    }

    async fn insert_room(
        &self,
        room_id: &RoomId,
        now: Timestamp,
    ) -> Result<RoomRecord, StoreError> {
        let mut state = self.state.lock().await;
        if state.rooms.contains_key(room_id) {
            return Err(StoreError::Conflict);
        }
        let record = RoomRecord {
            id: room_id.clone(),
            created_at: now,
            last_activity: now,
        };
        state.rooms.insert(room_id.clone(), record.clone());
        Ok(record)
    }

    async fn fetch_room(&self, room_id: &RoomId) -> Result<Option<RoomRecord>, StoreError> {
        Ok(self.state.lock().await.rooms.get(room_id).cloned())
    }

    async fn list_rooms(&self) -> Result<Vec<RoomRecord>, StoreError> {
        let state = self.state.lock().await;
        let mut rooms: Vec<RoomRecord> = state.rooms.values().cloned().collect();
        rooms.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(rooms)
    }

    async fn touch_room(&self, room_id: &RoomId, at: Timestamp) -> Result<(), StoreError> {
        if let Some(record) = self.state.lock().await.rooms.get_mut(room_id) {
            record.last_activity = at;
        }
        Ok(())
    }

    async fn list_inactive_rooms(&self, before: Timestamp) -> Result<Vec<RoomId>, StoreError> {
        let state = self.state.lock().await;
        let mut ids: Vec<RoomId> = state
            .rooms
            .values()
            .filter(|record| record.last_activity < before)
            .map(|record| record.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn delete_room(&self, room_id: &RoomId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.messages.iter().any(|(id, _)| id == room_id) {
            return Err(StoreError::Status {
                status: 409,
                body: format!("messages still reference room {}", room_id),
            });
        }
        state.rooms.remove(room_id);
        Ok(())
    }

    async fn insert_message(&self, message: &NewMessage) -> Result<ChatMessage, StoreError> {
        let mut state = self.state.lock().await;
        if !state.rooms.contains_key(&message.room_id) {
            return Err(StoreError::Status {
                status: 409,
                body: format!("room {} does not exist", message.room_id),
            });
        }
        state.next_message_id += 1;
        let stored = ChatMessage {
            id: Some(MessageId::new(state.next_message_id.to_string())),
            author: message.author.clone(),
            content: message.content.clone(),
            timestamp: message.timestamp,
        };
        state
            .messages
            .push((message.room_id.clone(), stored.clone()));
        Ok(stored)
    }

    async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError> {
        let state = self.state.lock().await;
        let mut messages: Vec<ChatMessage> = state
            .messages
            .iter()
            .filter(|(id, _)| id == room_id)
            .map(|(_, message)| message.clone())
            .collect();
        messages.sort_by_key(|message| message.timestamp);
        let skip = messages.len().saturating_sub(limit);
        Ok(messages.into_iter().skip(skip).collect())
    }

    async fn delete_messages(&self, room_id: &RoomId) -> Result<(), StoreError> {
        self.state
            .lock()
            .await
            .messages
            .retain(|(id, _)| id != room_id);
        Ok(())
    }
}
