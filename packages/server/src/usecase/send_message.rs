//! UseCase: メッセージ送信処理
//!
//! 処理順序: レート制限 → 内容の検証 → 永続化 → キャッシュへの追加 → 活動時刻の更新。
//! ブロードキャスト対象には送信者自身も含まれる。

use std::sync::Arc;

use hushroom_shared::time::Clock;

use crate::domain::{
    ChatMessage, ConnectionId, MessageContent, NewMessage, RateLimiter, RoomId, RoomRegistry,
    Timestamp,
};

use super::{error::ChatError, persistence::PersistenceBridge};

/// A stored message and the connections it must be delivered to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message: ChatMessage,
    pub targets: Vec<ConnectionId>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    bridge: Arc<PersistenceBridge>,
    registry: Arc<dyn RoomRegistry>,
    rate_limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        bridge: Arc<PersistenceBridge>,
        registry: Arc<dyn RoomRegistry>,
        rate_limiter: Arc<RateLimiter>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            bridge,
            registry,
            rate_limiter,
            clock,
        }
    }

    /// メッセージ送信を実行
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Delivery))` - 永続化済みのメッセージと配信先
    /// * `Ok(None)` - 送信者がルームの参加者ではないため無視した
    /// * `Err(ChatError)` - レート制限、検証エラー、永続化の失敗
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        raw_room_id: &str,
        text: &str,
    ) -> Result<Option<Delivery>, ChatError> {
        let Ok(room_id) = RoomId::new(raw_room_id) else {
            return Ok(None);
        };
        let Some(participant) = self.registry.participant(&room_id, &connection_id).await else {
            tracing::debug!(
                "Ignoring message from {} which is not in room {}",
                connection_id,
                room_id
            );
            return Ok(None);
        };

        if !self.rate_limiter.try_acquire(&connection_id).await {
            tracing::warn!("Rate limit exceeded for {} in room {}", connection_id, room_id);
            return Err(ChatError::RateLimited);
        }

        let content = MessageContent::new(text)?;
        let now = Timestamp::new(self.clock.now_millis());

        let message = self
            .bridge
            .save_message(&NewMessage {
                room_id: room_id.clone(),
                author: participant.name,
                content,
                timestamp: now,
            })
            .await?;

        let Some(targets) = self
            .registry
            .record_message(&room_id, &connection_id, message.clone(), now)
            .await
        else {
            tracing::debug!(
                "{} left room {} while its message was being stored",
                connection_id,
                room_id
            );
            return Ok(None);
        };

        // 配信は活動時刻の永続化の成否に依存しない
        if let Err(e) = self.bridge.touch_room(&room_id, now).await {
            tracing::warn!("Failed to record activity for room {}: {}", room_id, e);
        }

        Ok(Some(Delivery { message, targets }))
    }
}
