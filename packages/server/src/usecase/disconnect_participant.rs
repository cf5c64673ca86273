//! UseCase: 切断処理
//!
//! レート制限の状態と管理者フラグを破棄し、ルームに参加していれば退出させる。
//! 退出は永続ストアの活動時刻を変更しない。

use std::sync::Arc;

use hushroom_shared::time::Clock;

use crate::domain::{ConnectionId, Departure, MessagePusher, RateLimiter, RoomRegistry, Timestamp};

use super::admin::AdminSessions;

/// 切断のユースケース
pub struct DisconnectParticipantUseCase {
    registry: Arc<dyn RoomRegistry>,
    rate_limiter: Arc<RateLimiter>,
    admin_sessions: Arc<AdminSessions>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl DisconnectParticipantUseCase {
    pub fn new(
        registry: Arc<dyn RoomRegistry>,
        rate_limiter: Arc<RateLimiter>,
        admin_sessions: Arc<AdminSessions>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            rate_limiter,
            admin_sessions,
            message_pusher,
            clock,
        }
    }

    /// 切断を実行
    ///
    /// # Returns
    ///
    /// 参加していたルームからの退出情報（参加していなければ `None`）
    pub async fn execute(&self, connection_id: ConnectionId) -> Option<Departure> {
        self.message_pusher.unregister_client(&connection_id).await;
        self.rate_limiter.forget(&connection_id).await;
        if self.admin_sessions.revoke(&connection_id).await {
            tracing::info!("Admin session {} ended", connection_id);
        }

        let now = Timestamp::new(self.clock.now_millis());
        let departure = self.registry.leave(&connection_id, now).await;
        if let Some(departure) = &departure {
            tracing::info!(
                "{} ({}) left room {} ({} participant(s) remain)",
                departure.participant.name,
                connection_id,
                departure.room_id,
                departure.active_users.len()
            );
        }
        departure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{DisplayName, Participant, RateLimitPolicy, RoomId, RoomStore},
        usecase::test_support::{Fixture, START},
    };

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - DisconnectParticipantUseCase::execute()
    //
    // 【どのようなシナリオをテストするか】
    // 1. 参加中の接続：自分のエントリのみ削除され、残りの参加者が通知対象になる
    // 2. 未参加の接続：何も起きない
    // 3. 接続ごとの状態（レート制限、管理者フラグ、送信チャネル）が破棄される
    // 4. 永続ストアの活動時刻は変わらない
    // ========================================

    struct Harness {
        fixture: Fixture,
        rate_limiter: Arc<RateLimiter>,
        sessions: Arc<AdminSessions>,
        usecase: DisconnectParticipantUseCase,
    }

    fn harness() -> Harness {
        let fixture = Fixture::new();
        let rate_limiter = Arc::new(RateLimiter::new(
            RateLimitPolicy::default(),
            fixture.clock.clone(),
        ));
        let sessions = Arc::new(AdminSessions::default());
        let usecase = DisconnectParticipantUseCase::new(
            fixture.registry.clone(),
            rate_limiter.clone(),
            sessions.clone(),
            fixture.pusher.clone(),
            fixture.clock.clone(),
        );
        Harness {
            fixture,
            rate_limiter,
            sessions,
            usecase,
        }
    }

    async fn join(fixture: &Fixture, connection_id: ConnectionId, name: &str) {
        fixture
            .registry
            .join(
                &RoomId::new("AB12CD").unwrap(),
                Participant::new(connection_id, DisplayName::new(name), Timestamp::new(START)),
                Vec::new(),
                Timestamp::new(START),
            )
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_disconnect_removes_only_own_entry() {
        // テスト項目: 切断した接続のエントリだけが削除され、残りの参加者が通知対象になる
        // given (前提条件):
        let h = harness();
        let room_id = h.fixture.durable_room("AB12CD").await;
        let alice = ConnectionId::generate();
        let bob = ConnectionId::generate();
        join(&h.fixture, alice, "Guest_Swift_Wolf").await;
        join(&h.fixture, bob, "Guest_Brave_Fox").await;
        h.fixture.clock.advance(30_000);

        // when (操作):
        let departure = h.usecase.execute(bob).await.unwrap();

        // then (期待する結果):
        assert_eq!(departure.participant.name.as_str(), "Guest_Brave_Fox");
        assert_eq!(departure.active_users, vec![DisplayName::new("Guest_Swift_Wolf")]);
        assert_eq!(departure.notify, vec![alice]);
        assert_eq!(h.fixture.registry.participant_count(&room_id).await, 1);
        let record = h.fixture.store.fetch_room(&room_id).await.unwrap().unwrap();
        assert_eq!(record.last_activity, Timestamp::new(START));
    }

    #[tokio::test]
    async fn test_disconnect_outside_room_is_noop() {
        // テスト項目: ルームに参加していない接続の切断では何も起きない
        // given (前提条件):
        let h = harness();

        // when (操作):
        let departure = h.usecase.execute(ConnectionId::generate()).await;

        // then (期待する結果):
        assert_eq!(departure, None);
    }

    #[tokio::test]
    async fn test_disconnect_clears_connection_state() {
        // テスト項目: レート制限、管理者フラグ、送信チャネルが破棄される
        // given (前提条件):
        let h = harness();
        let (alice, _rx) = h.fixture.connect().await;
        h.rate_limiter.register(alice).await;
        h.sessions.grant(alice).await;

        // when (操作):
        h.usecase.execute(alice).await;

        // then (期待する結果):
        assert_eq!(h.rate_limiter.tracked_connections().await, 0);
        assert!(!h.sessions.is_admin(&alice).await);
        assert_eq!(h.fixture.pusher.client_count().await, 0);
    }
}
