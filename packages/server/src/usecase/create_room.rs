//! UseCase: ルーム作成処理
//!
//! 未使用のルームコードが見つかるまで候補を生成し、永続化してから
//! インメモリのエントリを作成する。試行回数には上限がある。

use std::sync::Arc;

use hushroom_shared::time::Clock;

use crate::domain::{IdentifierGenerator, RoomId, RoomRegistry, Timestamp};

use super::{
    error::ChatError,
    persistence::{MAX_ROOM_CODE_ATTEMPTS, PersistenceBridge},
};

/// ルーム作成のユースケース
pub struct CreateRoomUseCase {
    bridge: Arc<PersistenceBridge>,
    registry: Arc<dyn RoomRegistry>,
    generator: Arc<dyn IdentifierGenerator>,
    clock: Arc<dyn Clock>,
}

impl CreateRoomUseCase {
    pub fn new(
        bridge: Arc<PersistenceBridge>,
        registry: Arc<dyn RoomRegistry>,
        generator: Arc<dyn IdentifierGenerator>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bridge,
            registry,
            generator,
            clock,
        }
    }

    /// ルームを作成し、そのコードを返す
    ///
    /// 作成者自身はルームに参加しない。
    pub async fn execute(&self) -> Result<RoomId, ChatError> {
        for attempt in 1..=MAX_ROOM_CODE_ATTEMPTS {
            let candidate = self.generator.room_code();

            if self.registry.contains(&candidate).await
                || self.bridge.room_exists(&candidate).await?
            {
                tracing::debug!("Room code {} already taken (attempt {})", candidate, attempt);
                continue;
            }

            let now = Timestamp::new(self.clock.now_millis());
            let Some(record) = self.bridge.insert_room(&candidate, now).await? else {
                tracing::debug!(
                    "Room code {} was taken concurrently (attempt {})",
                    candidate,
                    attempt
                );
                continue;
            };

            self.registry.open_room(&record.id, record.created_at).await;
            tracing::info!("Room {} created", record.id);
            return Ok(record.id);
        }

        tracing::error!(
            "Gave up creating a room after {} colliding codes",
            MAX_ROOM_CODE_ATTEMPTS
        );
        Err(ChatError::CollisionExhausted(MAX_ROOM_CODE_ATTEMPTS))
    }
}
