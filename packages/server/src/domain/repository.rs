//! Repository trait 定義
//!
//! ドメイン層が必要とするデータアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! - `RoomStore`: 永続ストア。ルームの存在・履歴・タイムスタンプについての正。
//! - `RoomRegistry`: ライブな参加者のキャッシュ。プロセス再起動で失われてよい。

use std::collections::HashMap;

use async_trait::async_trait;

use super::{
    ChatMessage, ConnectionId, DisplayName, NewMessage, Participant, RoomError, RoomId,
    RoomRecord, StoreError, Timestamp,
};

/// Durable store of rooms and their message history.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RoomStore: Send + Sync {
    async fn room_exists(&self, room_id: &RoomId) -> Result<bool, StoreError>;

    /// Insert a room row; fails with [`StoreError::Conflict`] if the id is taken.
    async fn insert_room(&self, room_id: &RoomId, now: Timestamp)
    -> Result<RoomRecord, StoreError>;

    async fn fetch_room(&self, room_id: &RoomId) -> Result<Option<RoomRecord>, StoreError>;

    async fn list_rooms(&self) -> Result<Vec<RoomRecord>, StoreError>;

    async fn touch_room(&self, room_id: &RoomId, at: Timestamp) -> Result<(), StoreError>;

    /// Rooms whose last activity is strictly before `before`.
    async fn list_inactive_rooms(&self, before: Timestamp) -> Result<Vec<RoomId>, StoreError>;

    /// Delete the room row. Its messages must already be gone.
    async fn delete_room(&self, room_id: &RoomId) -> Result<(), StoreError>;

    async fn insert_message(&self, message: &NewMessage) -> Result<ChatMessage, StoreError>;

    /// The `limit` most recent messages of a room, oldest first.
    async fn recent_messages(
        &self,
        room_id: &RoomId,
        limit: usize,
    ) -> Result<Vec<ChatMessage>, StoreError>;

    async fn delete_messages(&self, room_id: &RoomId) -> Result<(), StoreError>;
}

/// Result of a successful join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinedRoom {
    /// Names of everyone in the room right after the join, joiner included
    pub active_users: Vec<DisplayName>,
    /// Participants to notify (everyone except the joiner)
    pub notify: Vec<ConnectionId>,
}

/// Result of removing a connection from its room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub room_id: RoomId,
    pub participant: Participant,
    /// Names of the remaining participants
    pub active_users: Vec<DisplayName>,
    /// Remaining participants to notify
    pub notify: Vec<ConnectionId>,
}

/// Authoritative map of live rooms and their participants.
///
/// A connection is in at most one room. Mutations of one room are serialized;
/// unrelated rooms never wait on each other. Every returned target list is the
/// participant set as it stood right after the mutation.
#[async_trait]
pub trait RoomRegistry: Send + Sync {
    /// Create an empty entry unless one already exists.
    async fn open_room(&self, room_id: &RoomId, now: Timestamp);

    /// Register a participant, creating the entry if the room fell out of memory.
    ///
    /// `history` seeds the message cache of a cold entry.
    async fn join(
        &self,
        room_id: &RoomId,
        participant: Participant,
        history: Vec<ChatMessage>,
        now: Timestamp,
    ) -> Result<JoinedRoom, RoomError>;

    /// Remove a connection from whichever room holds it.
    async fn leave(&self, connection_id: &ConnectionId, now: Timestamp) -> Option<Departure>;

    async fn room_of(&self, connection_id: &ConnectionId) -> Option<RoomId>;

    async fn participant(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Option<Participant>;

    /// Cache a message sent by a participant and return every participant to deliver it to.
    ///
    /// `None` if the sender is no longer in the room.
    async fn record_message(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
        message: ChatMessage,
        now: Timestamp,
    ) -> Option<Vec<ConnectionId>>;

    /// The sender's name and everyone else in the room.
    async fn typing_targets(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Option<(DisplayName, Vec<ConnectionId>)>;

    /// Drop the entry and hand back everyone who was inside.
    async fn evict_room(&self, room_id: &RoomId) -> Vec<Participant>;

    /// Drop the entry if it has no participants.
    ///
    /// Returns `true` if the room is now absent from memory.
    async fn remove_if_idle(&self, room_id: &RoomId) -> bool;

    async fn participant_count(&self, room_id: &RoomId) -> usize;

    async fn participant_counts(&self) -> HashMap<RoomId, usize>;

    async fn recent_messages(&self, room_id: &RoomId) -> Vec<ChatMessage>;

    async fn contains(&self, room_id: &RoomId) -> bool;
}
