//! UseCase: ルーム参加処理
//!
//! 永続ストアでルームの存在を確認し、活動時刻を更新して履歴を読み込んだ後に
//! 参加者を登録する。永続ストアの処理が失敗した場合、インメモリ状態は変化しない。
//! 元のルームから退出した後に参加が失敗した場合は、その退出を [`JoinFailure`] で返す。

use std::sync::Arc;

use hushroom_shared::time::Clock;

use crate::domain::{
    ChatMessage, ConnectionId, Departure, DisplayName, IdentifierGenerator, Participant,
    RoomError, RoomId, RoomRegistry, Timestamp,
};

use super::{error::ChatError, persistence::PersistenceBridge};

/// Result of a successful join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    pub room_id: RoomId,
    pub username: DisplayName,
    /// Recent history, oldest first
    pub messages: Vec<ChatMessage>,
    pub active_users: Vec<DisplayName>,
    /// Participants already in the room before this join
    pub notify: Vec<ConnectionId>,
    /// Room the connection was in before, if any
    pub left: Option<Departure>,
}

/// Failed join
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinFailure {
    pub error: ChatError,
    /// Room the connection had already left when the join was rejected
    pub left: Option<Departure>,
}

impl From<ChatError> for JoinFailure {
    fn from(error: ChatError) -> Self {
        Self { error, left: None }
    }
}

/// ルーム参加のユースケース
pub struct JoinRoomUseCase {
    bridge: Arc<PersistenceBridge>,
    registry: Arc<dyn RoomRegistry>,
    generator: Arc<dyn IdentifierGenerator>,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
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

    /// ルーム参加を実行
    ///
    /// 形式が不正なコードは存在しないルームとして扱う。
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        raw_room_id: &str,
    ) -> Result<JoinOutcome, JoinFailure> {
        let room_id = RoomId::new(raw_room_id).map_err(|_| ChatError::RoomNotFound)?;

        if self.bridge.find_room(&room_id).await?.is_none() {
            tracing::info!("Join rejected: room {} does not exist", room_id);
            return Err(ChatError::RoomNotFound.into());
        }

        let now = Timestamp::new(self.clock.now_millis());
        self.bridge.touch_room(&room_id, now).await?;
        let history = self.bridge.load_history(&room_id).await?;

        // 1 接続は同時に 1 ルームにのみ所属する
        let left = self.registry.leave(&connection_id, now).await;

        let username = self.generator.display_name();
        let participant = Participant::new(connection_id, username.clone(), now);
        let joined = match self
            .registry
            .join(&room_id, participant, history.clone(), now)
            .await
        {
            Ok(joined) => joined,
            Err(e) => {
                match e {
                    RoomError::RoomClosed(_) => {
                        tracing::info!("Join rejected: room {} is being removed", room_id);
                    }
                    RoomError::DuplicateParticipant(_) => {
                        tracing::warn!(
                            "Connection {} joined room {} twice",
                            connection_id,
                            room_id
                        );
                    }
                }
                return Err(JoinFailure {
                    error: ChatError::RoomNotFound,
                    left,
                });
            }
        };

        tracing::info!(
            "{} ({}) joined room {} ({} participant(s))",
            username,
            connection_id,
            room_id,
            joined.active_users.len()
        );

        Ok(JoinOutcome {
            room_id,
            username,
            messages: history,
            active_users: joined.active_users,
            notify: joined.notify,
            left,
        })
    }
}
