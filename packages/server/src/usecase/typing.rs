//! UseCase: 入力中インジケータ
//!
//! 永続化もレート制限もしない。送信者以外の参加者にのみ通知する。

use std::sync::Arc;

use crate::domain::{ConnectionId, DisplayName, RoomId, RoomRegistry};

/// Who is typing and who should be told
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingNotice {
    pub username: DisplayName,
    pub targets: Vec<ConnectionId>,
}

pub struct TypingUseCase {
    registry: Arc<dyn RoomRegistry>,
}

impl TypingUseCase {
    pub fn new(registry: Arc<dyn RoomRegistry>) -> Self {
        Self { registry }
    }

    /// `None` if the connection is not a participant of the room
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        raw_room_id: &str,
    ) -> Option<TypingNotice> {
        let room_id = RoomId::new(raw_room_id).ok()?;
        let (username, targets) = self
            .registry
            .typing_targets(&room_id, &connection_id)
            .await?;
        Some(TypingNotice { username, targets })
    }
}
