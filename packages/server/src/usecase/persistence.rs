//! Persistence Bridge
//!
//! Wraps every [`RoomStore`] call in a deadline and turns failures into
//! [`ChatError`]. The durable store is authoritative for room identity,
//! history and activity timestamps.

use std::{future::Future, sync::Arc, time::Duration};

use crate::domain::{ChatMessage, NewMessage, RoomId, RoomRecord, RoomStore, StoreError, Timestamp};

use super::error::ChatError;

/// Maximum number of room codes tried before giving up
pub const MAX_ROOM_CODE_ATTEMPTS: usize = 10;

pub struct PersistenceBridge {
    store: Arc<dyn RoomStore>,
    timeout: Duration,
    history_limit: usize,
}

impl PersistenceBridge {
    pub fn new(store: Arc<dyn RoomStore>, timeout: Duration, history_limit: usize) -> Self {
        Self {
            store,
            timeout,
            history_limit,
        }
    }

    pub fn history_limit(&self) -> usize {
        self.history_limit
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, StoreError> {
        let result = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(StoreError::Timeout(operation)),
        };
        if let Err(e) = &result {
            tracing::error!("Durable store call '{}' failed: {}", operation, e);
        }
        result
    }

    async fn call<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T, StoreError>>,
    ) -> Result<T, ChatError> {
        self.bounded(operation, call)
            .await
            .map_err(|e| ChatError::storage(operation, e))
    }

    pub async fn room_exists(&self, room_id: &RoomId) -> Result<bool, ChatError> {
        self.call("room_exists", self.store.room_exists(room_id)).await
    }

    /// Insert a new room row.
    ///
    /// Returns `Ok(None)` when the code was taken concurrently.
    pub async fn insert_room(
        &self,
        room_id: &RoomId,
        now: Timestamp,
    ) -> Result<Option<RoomRecord>, ChatError> {
        match self
            .bounded("insert_room", self.store.insert_room(room_id, now))
            .await
        {
            Ok(record) => Ok(Some(record)),
            Err(StoreError::Conflict) => Ok(None),
            Err(e) => Err(ChatError::storage("insert_room", e)),
        }
    }

    pub async fn find_room(&self, room_id: &RoomId) -> Result<Option<RoomRecord>, ChatError> {
        self.call("fetch_room", self.store.fetch_room(room_id)).await
    }

    pub async fn touch_room(&self, room_id: &RoomId, now: Timestamp) -> Result<(), ChatError> {
        self.call("touch_room", self.store.touch_room(room_id, now))
            .await
    }

    /// Most recent messages of a room, oldest first
    pub async fn load_history(&self, room_id: &RoomId) -> Result<Vec<ChatMessage>, ChatError> {
        self.call(
            "recent_messages",
            self.store.recent_messages(room_id, self.history_limit),
        )
        .await
    }

    pub async fn save_message(&self, message: &NewMessage) -> Result<ChatMessage, ChatError> {
        self.call("insert_message", self.store.insert_message(message))
            .await
    }

    pub async fn list_rooms(&self) -> Result<Vec<RoomRecord>, ChatError> {
        self.call("list_rooms", self.store.list_rooms()).await
    }

    pub async fn inactive_rooms(&self, before: Timestamp) -> Result<Vec<RoomId>, ChatError> {
        self.call("list_inactive_rooms", self.store.list_inactive_rooms(before))
            .await
    }

    /// Delete a room's messages and then the room row.
    ///
    /// A failure after the messages are gone is reported as
    /// [`ChatError::PartialDelete`] and is not retried.
    pub async fn delete_room(&self, room_id: &RoomId) -> Result<(), ChatError> {
        self.call("delete_messages", self.store.delete_messages(room_id))
            .await?;
        self.bounded("delete_room", self.store.delete_room(room_id))
            .await
            .map_err(|source| ChatError::PartialDelete {
                room_id: room_id.clone(),
                source,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::repository::MockRoomStore;
    use crate::infrastructure::store::InMemoryRoomStore;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - ストアのエラーとタイムアウトが ChatError::Storage に変換されること
    // - insert_room の衝突が None として扱われること
    // - delete_room がメッセージ → ルームの順で削除し、途中失敗を区別すること
    // ========================================

    fn room_id() -> RoomId {
        RoomId::new("AB12CD").unwrap()
    }

    fn bridge(store: impl RoomStore + 'static) -> PersistenceBridge {
        PersistenceBridge::new(Arc::new(store), Duration::from_millis(100), 50)
    }

    #[tokio::test]
    async fn test_insert_conflict_is_reported_as_none() {
        // テスト項目: 既に存在するコードの挿入は None になる
        // given (前提条件):
        let store = InMemoryRoomStore::new();
        store.insert_room(&room_id(), Timestamp::new(0)).await.unwrap();
        let bridge = bridge(store);

        // when (操作):
        let result = bridge.insert_room(&room_id(), Timestamp::new(1)).await;

        // then (期待する結果):
        assert_eq!(result, Ok(None));
    }

    #[tokio::test]
    async fn test_store_failure_maps_to_storage_error() {
        // テスト項目: ストアのエラーは操作名付きの Storage エラーになる
        // given (前提条件):
        let mut store = MockRoomStore::new();
        store
            .expect_fetch_room()
            .returning(|_| Err(StoreError::Request("connection refused".to_string())));
        let bridge = bridge(store);

        // when (操作):
        let result = bridge.find_room(&room_id()).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ChatError::Storage {
                operation: "fetch_room",
                source: StoreError::Request("connection refused".to_string()),
            })
        );
    }

    struct HangingStore;

    #[async_trait::async_trait]
    impl RoomStore for HangingStore {
        async fn room_exists(&self, _room_id: &RoomId) -> Result<bool, StoreError> {
            std::future::pending().await
        }
        async fn insert_room(
            &self,
            _room_id: &RoomId,
            _now: Timestamp,
        ) -> Result<RoomRecord, StoreError> {
            std::future::pending().await
        }
        async fn fetch_room(&self, _room_id: &RoomId) -> Result<Option<RoomRecord>, StoreError> {
            std::future::pending().await
        }
        async fn list_rooms(&self) -> Result<Vec<RoomRecord>, StoreError> {
            std::future::pending().await
        }
        async fn touch_room(&self, _room_id: &RoomId, _at: Timestamp) -> Result<(), StoreError> {
            std::future::pending().await
        }
        async fn list_inactive_rooms(&self, _before: Timestamp) -> Result<Vec<RoomId>, StoreError> {
            std::future::pending().await
        }
        async fn delete_room(&self, _room_id: &RoomId) -> Result<(), StoreError> {
            std::future::pending().await
        }
        async fn insert_message(&self, _message: &NewMessage) -> Result<ChatMessage, StoreError> {
            std::future::pending().await
        }
        async fn recent_messages(
            &self,
            _room_id: &RoomId,
            _limit: usize,
        ) -> Result<Vec<ChatMessage>, StoreError> {
            std::future::pending().await
        }
        async fn delete_messages(&self, _room_id: &RoomId) -> Result<(), StoreError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn test_hanging_call_times_out() {
        // テスト項目: 応答しないストア呼び出しはタイムアウトで Storage エラーになる
        // given (前提条件):
        let bridge = bridge(HangingStore);

        // when (操作):
        let result = bridge.room_exists(&room_id()).await;

        // then (期待する結果):
        assert_eq!(
            result,
            Err(ChatError::Storage {
                operation: "room_exists",
                source: StoreError::Timeout("room_exists"),
            })
        );
    }

    #[tokio::test]
    async fn test_delete_room_removes_messages_first() {
        // テスト項目: メッセージを先に削除してからルームを削除する
        // given (前提条件):
        let mut store = MockRoomStore::new();
        let mut seq = mockall::Sequence::new();
        store
            .expect_delete_messages()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        store
            .expect_delete_room()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
        let bridge = bridge(store);

        // when (操作):
        let result = bridge.delete_room(&room_id()).await;

        // then (期待する結果):
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_delete_room_partial_failure_is_distinct() {
        // テスト項目: メッセージ削除後のルーム削除失敗は PartialDelete になる
        // given (前提条件):
        let mut store = MockRoomStore::new();
        store.expect_delete_messages().returning(|_| Ok(()));
        store.expect_delete_room().returning(|_| {
            Err(StoreError::Status {
                status: 500,
                body: "boom".to_string(),
            })
        });
        let bridge = bridge(store);

        // when (操作):
        let result = bridge.delete_room(&room_id()).await;

        // then (期待する結果):
        assert!(matches!(result, Err(ChatError::PartialDelete { .. })));
    }

    #[tokio::test]
    async fn test_delete_messages_failure_keeps_room() {
        // テスト項目: メッセージ削除に失敗した場合はルームを削除しない
        // given (前提条件):
        let mut store = MockRoomStore::new();
        store
            .expect_delete_messages()
            .returning(|_| Err(StoreError::Request("down".to_string())));
        store.expect_delete_room().never();
        let bridge = bridge(store);

        // when (操作):
        let result = bridge.delete_room(&room_id()).await;

        // then (期待する結果):
        assert!(matches!(
            result,
            Err(ChatError::Storage {
                operation: "delete_messages",
                ..
            })
        ));
    }
}
