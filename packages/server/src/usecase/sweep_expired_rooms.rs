//! UseCase: 期限切れルームの掃除
//!
//! 永続ストア上で最終活動時刻が期限を過ぎたルームのうち、参加者がいないものを削除する。
//! 参加者がいるルームは永続側の時刻が古くても削除しない。
//! 1 ルームの失敗は記録してスキップし、掃除全体は中断しない。

use std::sync::Arc;

use hushroom_shared::time::Clock;

use crate::domain::{RoomId, RoomRegistry, Timestamp};

use super::{error::ChatError, persistence::PersistenceBridge};

/// Outcome of one sweep pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub swept: Vec<RoomId>,
    pub skipped_live: Vec<RoomId>,
    pub failed: Vec<RoomId>,
}

pub struct SweepExpiredRoomsUseCase {
    bridge: Arc<PersistenceBridge>,
    registry: Arc<dyn RoomRegistry>,
    clock: Arc<dyn Clock>,
    expiry_millis: i64,
}

impl SweepExpiredRoomsUseCase {
    pub fn new(
        bridge: Arc<PersistenceBridge>,
        registry: Arc<dyn RoomRegistry>,
        clock: Arc<dyn Clock>,
        expiry_millis: i64,
    ) -> Self {
        Self {
            bridge,
            registry,
            clock,
            expiry_millis,
        }
    }

    /// 掃除を 1 回実行する
    ///
    /// 期限切れルームの一覧取得に失敗した場合のみエラーを返す。
    pub async fn execute(&self) -> Result<SweepReport, ChatError> {
        let now = Timestamp::new(self.clock.now_millis());
        let cutoff = now.minus_millis(self.expiry_millis);
        let candidates = self.bridge.inactive_rooms(cutoff).await?;

        let mut report = SweepReport::default();
        for room_id in candidates {
            // 先にインメモリから外して、以降の参加を RoomNotFound にする
            if !self.registry.remove_if_idle(&room_id).await {
                tracing::debug!("Room {} is stale but still has participants, skipping", room_id);
                report.skipped_live.push(room_id);
                continue;
            }

            match self.bridge.delete_room(&room_id).await {
                Ok(()) => {
                    tracing::info!("Room {} expired and was removed", room_id);
                    report.swept.push(room_id);
                }
                Err(e) => {
                    tracing::error!("Failed to remove expired room {}: {}", room_id, e);
                    report.failed.push(room_id);
                }
            }
        }

        Ok(report)
    }
}
