//! InMemory Room Registry 実装
//!
//! ドメイン層が定義する RoomRegistry trait の具体的な実装。
//!
//! ## ロックの構成
//!
//! - `rooms`: ルーム ID → ルーム本体のマップ（`RwLock`）。エントリの追加・削除時のみ書き込みロック。
//! - 各ルーム本体は個別の `Mutex` で保護され、参加者とメッセージキャッシュの変更はルーム単位で直列化される。
//! - `memberships`: 接続 ID → 所属ルーム ID の索引。
//!
//! ロック順序は `rooms` → ルーム → `memberships`。逆順で取得するコードパスは存在しない。

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::{Mutex, RwLock};

use crate::domain::{
    ChatMessage, ConnectionId, Departure, DisplayName, JoinedRoom, Participant, Room, RoomError,
    RoomId, RoomRegistry, Timestamp,
};

/// インメモリ Room Registry 実装
pub struct InMemoryRoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<Mutex<Room>>>>,
    memberships: Mutex<HashMap<ConnectionId, RoomId>>,
    /// 各ルームのメッセージキャッシュ上限
    message_capacity: usize,
}

impl InMemoryRoomRegistry {
    /// 新しい InMemoryRoomRegistry を作成
    pub fn new(message_capacity: usize) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            memberships: Mutex::new(HashMap::new()),
            message_capacity,
        }
    }

    async fn room(&self, room_id: &RoomId) -> Option<Arc<Mutex<Room>>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    async fn room_or_insert(&self, room_id: &RoomId, now: Timestamp) -> Arc<Mutex<Room>> {
        if let Some(room) = self.room(room_id).await {
            return room;
        }
        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id.clone())
            .or_insert_with(|| {
                tracing::debug!("Room {} added to registry", room_id);
                Arc::new(Mutex::new(Room::new(
                    room_id.clone(),
                    now,
                    self.message_capacity,
                )))
            })
            .clone()
    }
}

#[async_trait]
impl RoomRegistry for InMemoryRoomRegistry {
    async fn open_room(&self, room_id: &RoomId, now: Timestamp) {
        self.room_or_insert(room_id, now).await;
    }

    async fn join(
        &self,
        room_id: &RoomId,
        participant: Participant,
        history: Vec<ChatMessage>,
        now: Timestamp,
    ) -> Result<JoinedRoom, RoomError> {
        let room = self.room_or_insert(room_id, now).await;
        let mut room = room.lock().await;
        if room.is_closed() {
            return Err(RoomError::RoomClosed(room_id.to_string()));
        }

        let connection_id = participant.connection_id;
        room.seed_messages(history);
        room.add_participant(participant)?;
        room.touch(None, now);
        self.memberships
            .lock()
            .await
            .insert(connection_id, room_id.clone());

        Ok(JoinedRoom {
            active_users: room.participant_names(),
            notify: room.connection_ids_except(&connection_id),
        })
    }

    async fn leave(&self, connection_id: &ConnectionId, now: Timestamp) -> Option<Departure> {
        let room_id = self.memberships.lock().await.remove(connection_id)?;
        let room = self.room(&room_id).await?;
        let mut room = room.lock().await;
        let participant = room.remove_participant(connection_id)?;
        room.touch(None, now);

        Some(Departure {
            room_id,
            participant,
            active_users: room.participant_names(),
            notify: room.connection_ids(),
        })
    }

    async fn room_of(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        self.memberships.lock().await.get(connection_id).cloned()
    }

    async fn participant(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Option<Participant> {
        let room = self.room(room_id).await?;
        let room = room.lock().await;
        room.participant(connection_id).cloned()
    }

    async fn record_message(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
        message: ChatMessage,
        now: Timestamp,
    ) -> Option<Vec<ConnectionId>> {
        let room = self.room(room_id).await?;
        let mut room = room.lock().await;
        room.participant(connection_id)?;
        room.push_message(message);
        room.touch(Some(connection_id), now);
        Some(room.connection_ids())
    }

    async fn typing_targets(
        &self,
        room_id: &RoomId,
        connection_id: &ConnectionId,
    ) -> Option<(DisplayName, Vec<ConnectionId>)> {
        let room = self.room(room_id).await?;
        let room = room.lock().await;
        let name = room.participant(connection_id)?.name.clone();
        Some((name, room.connection_ids_except(connection_id)))
    }

    async fn evict_room(&self, room_id: &RoomId) -> Vec<Participant> {
        let Some(room) = self.rooms.write().await.remove(room_id) else {
            return Vec::new();
        };
        let evicted = room.lock().await.close();

        let mut memberships = self.memberships.lock().await;
        for participant in &evicted {
            if memberships.get(&participant.connection_id) == Some(room_id) {
                memberships.remove(&participant.connection_id);
            }
        }
        tracing::debug!(
            "Room {} evicted from registry with {} participant(s)",
            room_id,
            evicted.len()
        );
        evicted
    }

    async fn remove_if_idle(&self, room_id: &RoomId) -> bool {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get(room_id).cloned() else {
            return true;
        };
        let mut room = room.lock().await;
        if !room.is_empty() {
            return false;
        }
        room.close();
        rooms.remove(room_id);
        true
    }

    async fn participant_count(&self, room_id: &RoomId) -> usize {
        let Some(room) = self.room(room_id).await else {
            return 0;
        };
        let count = room.lock().await.participant_count();
        count
    }

    async fn participant_counts(&self) -> HashMap<RoomId, usize> {
        let rooms: Vec<(RoomId, Arc<Mutex<Room>>)> = self
            .rooms
            .read()
            .await
            .iter()
            .map(|(id, room)| (id.clone(), room.clone()))
            .collect();

        let mut counts = HashMap::with_capacity(rooms.len());
        for (id, room) in rooms {
            counts.insert(id, room.lock().await.participant_count());
        }
        counts
    }

    async fn recent_messages(&self, room_id: &RoomId) -> Vec<ChatMessage> {
        let Some(room) = self.room(room_id).await else {
            return Vec::new();
        };
        let messages = room.lock().await.recent_messages().cloned().collect();
        messages
    }

    async fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.read().await.contains_key(room_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MessageContent;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 参加・退出・メッセージ記録・ルーム削除によるレジストリの状態変化
    // - 返される通知対象が変更直後の参加者集合と一致すること
    //
    // 【なぜこのテストが必要か】
    // - ブロードキャスト対象と参加者集合の整合性はこのレジストリだけが保証する
    // - 1 接続 = 最大 1 ルームの不変条件を維持する必要がある
    // ========================================

    fn room_id(code: &str) -> RoomId {
        RoomId::new(code).unwrap()
    }

    fn participant(name: &str) -> Participant {
        Participant::new(
            ConnectionId::generate(),
            DisplayName::new(name),
            Timestamp::new(100),
        )
    }

    fn message(text: &str) -> ChatMessage {
        ChatMessage {
            id: None,
            author: DisplayName::new("Guest_Swift_Wolf"),
            content: MessageContent::new(text).unwrap(),
            timestamp: Timestamp::new(100),
        }
    }

    #[tokio::test]
    async fn test_join_creates_entry_lazily() {
        // テスト項目: メモリ上にないルームへの参加でエントリが作られる
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let id = room_id("AB12CD");
        let alice = participant("Guest_Swift_Wolf");

        // when (操作):
        let joined = registry
            .join(&id, alice.clone(), vec![], Timestamp::new(100))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(registry.contains(&id).await);
        assert_eq!(joined.active_users, vec![alice.name.clone()]);
        assert!(joined.notify.is_empty());
        assert_eq!(registry.room_of(&alice.connection_id).await, Some(id));
    }

    #[tokio::test]
    async fn test_join_notifies_existing_participants_only() {
        // テスト項目: 参加通知の対象は既存の参加者のみで、名前リストには参加者全員が含まれる
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let id = room_id("AB12CD");
        let alice = participant("Guest_Swift_Wolf");
        let bob = participant("Guest_Brave_Fox");
        registry
            .join(&id, alice.clone(), vec![], Timestamp::new(100))
            .await
            .unwrap();

        // when (操作):
        let joined = registry
            .join(&id, bob.clone(), vec![], Timestamp::new(200))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(joined.notify, vec![alice.connection_id]);
        assert_eq!(joined.active_users, vec![alice.name, bob.name]);
    }

    #[tokio::test]
    async fn test_join_seeds_cold_cache_from_history() {
        // テスト項目: メモリから消えていたルームは履歴でキャッシュが補充される
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let id = room_id("AB12CD");

        // when (操作):
        registry
            .join(
                &id,
                participant("Guest_Swift_Wolf"),
                vec![message("earlier")],
                Timestamp::new(100),
            )
            .await
            .unwrap();

        // then (期待する結果):
        let cached = registry.recent_messages(&id).await;
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].content.as_str(), "earlier");
    }

    #[tokio::test]
    async fn test_leave_removes_only_own_entry() {
        // テスト項目: 退出は自分のエントリだけを削除し、残りの参加者が通知対象になる
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let id = room_id("AB12CD");
        let alice = participant("Guest_Swift_Wolf");
        let bob = participant("Guest_Brave_Fox");
        for p in [&alice, &bob] {
            registry
                .join(&id, p.clone(), vec![], Timestamp::new(100))
                .await
                .unwrap();
        }

        // when (操作):
        let departure = registry
            .leave(&bob.connection_id, Timestamp::new(300))
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(departure.room_id, id);
        assert_eq!(departure.participant.name, bob.name);
        assert_eq!(departure.active_users, vec![alice.name.clone()]);
        assert_eq!(departure.notify, vec![alice.connection_id]);
        assert_eq!(registry.participant_count(&id).await, 1);
        assert_eq!(registry.room_of(&bob.connection_id).await, None);
    }

    #[tokio::test]
    async fn test_leave_without_room_is_noop() {
        // テスト項目: どのルームにも属さない接続の退出は何もしない
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);

        // when (操作):
        let departure = registry
            .leave(&ConnectionId::generate(), Timestamp::new(1))
            .await;

        // then (期待する結果):
        assert_eq!(departure, None);
    }

    #[tokio::test]
    async fn test_record_message_targets_everyone_including_sender() {
        // テスト項目: メッセージの配信対象には送信者自身も含まれる
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let id = room_id("AB12CD");
        let alice = participant("Guest_Swift_Wolf");
        let bob = participant("Guest_Brave_Fox");
        for p in [&alice, &bob] {
            registry
                .join(&id, p.clone(), vec![], Timestamp::new(100))
                .await
                .unwrap();
        }

        // when (操作):
        let targets = registry
            .record_message(
                &id,
                &alice.connection_id,
                message("hello"),
                Timestamp::new(200),
            )
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(targets, vec![alice.connection_id, bob.connection_id]);
        assert_eq!(registry.recent_messages(&id).await.len(), 1);
    }

    #[tokio::test]
    async fn test_record_message_from_non_participant_is_rejected() {
        // テスト項目: 参加していない接続からのメッセージは記録されない
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let id = room_id("AB12CD");
        registry.open_room(&id, Timestamp::new(1)).await;

        // when (操作):
        let targets = registry
            .record_message(
                &id,
                &ConnectionId::generate(),
                message("hello"),
                Timestamp::new(2),
            )
            .await;

        // then (期待する結果):
        assert_eq!(targets, None);
        assert!(registry.recent_messages(&id).await.is_empty());
    }

    #[tokio::test]
    async fn test_typing_targets_exclude_sender() {
        // テスト項目: 入力中通知の対象に送信者は含まれない
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let id = room_id("AB12CD");
        let alice = participant("Guest_Swift_Wolf");
        let bob = participant("Guest_Brave_Fox");
        for p in [&alice, &bob] {
            registry
                .join(&id, p.clone(), vec![], Timestamp::new(100))
                .await
                .unwrap();
        }

        // when (操作):
        let (name, targets) = registry
            .typing_targets(&id, &alice.connection_id)
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(name, alice.name);
        assert_eq!(targets, vec![bob.connection_id]);
    }

    #[tokio::test]
    async fn test_evict_room_returns_participants_and_clears_memberships() {
        // テスト項目: ルーム削除で参加者が返され、所属情報も消える
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let id = room_id("AB12CD");
        let alice = participant("Guest_Swift_Wolf");
        registry
            .join(&id, alice.clone(), vec![], Timestamp::new(100))
            .await
            .unwrap();

        // when (操作):
        let evicted = registry.evict_room(&id).await;

        // then (期待する結果):
        assert_eq!(evicted, vec![alice.clone()]);
        assert!(!registry.contains(&id).await);
        assert_eq!(registry.room_of(&alice.connection_id).await, None);
        assert_eq!(
            registry.leave(&alice.connection_id, Timestamp::new(1)).await,
            None
        );
    }

    #[tokio::test]
    async fn test_remove_if_idle_keeps_live_rooms() {
        // テスト項目: 参加者がいるルームは remove_if_idle で削除されない
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let live = room_id("AB12CD");
        let idle = room_id("ZZ99ZZ");
        registry
            .join(
                &live,
                participant("Guest_Swift_Wolf"),
                vec![],
                Timestamp::new(1),
            )
            .await
            .unwrap();
        registry.open_room(&idle, Timestamp::new(1)).await;

        // when (操作):
        let live_removed = registry.remove_if_idle(&live).await;
        let idle_removed = registry.remove_if_idle(&idle).await;
        let absent_removed = registry.remove_if_idle(&room_id("000000")).await;

        // then (期待する結果):
        assert!(!live_removed);
        assert!(idle_removed);
        assert!(absent_removed);
        assert!(registry.contains(&live).await);
        assert!(!registry.contains(&idle).await);
    }

    #[tokio::test]
    async fn test_participant_counts_cover_every_room() {
        // テスト項目: 全ルームの参加者数が取得できる
        // given (前提条件):
        let registry = InMemoryRoomRegistry::new(50);
        let busy = room_id("AB12CD");
        let empty = room_id("ZZ99ZZ");
        registry.open_room(&empty, Timestamp::new(1)).await;
        for name in ["Guest_Swift_Wolf", "Guest_Brave_Fox"] {
            registry
                .join(&busy, participant(name), vec![], Timestamp::new(1))
                .await
                .unwrap();
        }

        // when (操作):
        let counts = registry.participant_counts().await;

        // then (期待する結果):
        assert_eq!(counts.get(&busy), Some(&2));
        assert_eq!(counts.get(&empty), Some(&0));
    }

    #[tokio::test]
    async fn test_concurrent_joins_are_all_registered() {
        // テスト項目: 同じルームへの同時参加がすべて反映される
        // given (前提条件):
        let registry = Arc::new(InMemoryRoomRegistry::new(50));
        let id = room_id("AB12CD");

        // when (操作):
        let mut handles = Vec::new();
        for i in 0..20 {
            let registry = registry.clone();
            let id = id.clone();
            handles.push(tokio::spawn(async move {
                registry
                    .join(
                        &id,
                        participant(&format!("Guest_{i}")),
                        vec![],
                        Timestamp::new(i),
                    )
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // then (期待する結果):
        assert_eq!(registry.participant_count(&id).await, 20);
    }
}
