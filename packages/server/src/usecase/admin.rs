//! UseCase: 管理者コントロールプレーン
//!
//! 共有シークレットによる認証、ルーム一覧、ルームの強制削除を扱う。
//! 管理者フラグは接続ごとに保持され、切断時にのみ解除される。

use std::{collections::HashSet, sync::Arc};

use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

use crate::domain::{ConnectionId, MessagePusher, RoomId, RoomRegistry, RoomSummary};

use super::{error::ChatError, persistence::PersistenceBridge};

/// Connections that passed the admin secret check
#[derive(Debug, Default)]
pub struct AdminSessions {
    sessions: RwLock<HashSet<ConnectionId>>,
}

impl AdminSessions {
    pub async fn grant(&self, connection_id: ConnectionId) {
        self.sessions.write().await.insert(connection_id);
    }

    /// Returns `true` if the connection was an admin
    pub async fn revoke(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.write().await.remove(connection_id)
    }

    pub async fn is_admin(&self, connection_id: &ConnectionId) -> bool {
        self.sessions.read().await.contains(connection_id)
    }

    pub async fn all(&self) -> Vec<ConnectionId> {
        self.sessions.read().await.iter().copied().collect()
    }

    /// Every admin except `connection_id`
    pub async fn others(&self, connection_id: &ConnectionId) -> Vec<ConnectionId> {
        self.sessions
            .read()
            .await
            .iter()
            .filter(|id| *id != connection_id)
            .copied()
            .collect()
    }
}

/// Result of an admin room deletion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDeletion {
    pub room_id: RoomId,
    pub evicted: usize,
    /// Other admins to notify
    pub notify: Vec<ConnectionId>,
}

/// 管理者操作のユースケース
pub struct AdminUseCase {
    bridge: Arc<PersistenceBridge>,
    registry: Arc<dyn RoomRegistry>,
    sessions: Arc<AdminSessions>,
    message_pusher: Arc<dyn MessagePusher>,
    admin_secret: Option<String>,
}

impl AdminUseCase {
    pub fn new(
        bridge: Arc<PersistenceBridge>,
        registry: Arc<dyn RoomRegistry>,
        sessions: Arc<AdminSessions>,
        message_pusher: Arc<dyn MessagePusher>,
        admin_secret: Option<String>,
    ) -> Self {
        Self {
            bridge,
            registry,
            sessions,
            message_pusher,
            admin_secret,
        }
    }

    /// 共有シークレットを照合し、一致すれば接続を管理者にする
    ///
    /// シークレットが設定されていない場合は常に失敗する。
    pub async fn authenticate(&self, connection_id: ConnectionId, secret: &str) -> bool {
        let Some(expected) = self.admin_secret.as_deref() else {
            tracing::warn!(
                "Admin login attempt from {} rejected: no admin secret configured",
                connection_id
            );
            return false;
        };
        if !secrets_match(secret, expected) {
            tracing::warn!("Admin login attempt from {} rejected", connection_id);
            return false;
        }

        self.sessions.grant(connection_id).await;
        tracing::info!("Connection {} authenticated as admin", connection_id);
        true
    }

    /// 永続ストアのルーム一覧にインメモリの参加者数を結合する
    ///
    /// インメモリにエントリがないルームの参加者数は 0。
    pub async fn snapshot(&self) -> Result<Vec<RoomSummary>, ChatError> {
        let records = self.bridge.list_rooms().await?;
        let counts = self.registry.participant_counts().await;
        Ok(records
            .into_iter()
            .map(|record| {
                let participant_count = counts.get(&record.id).copied().unwrap_or(0);
                RoomSummary {
                    record,
                    participant_count,
                }
            })
            .collect())
    }

    pub async fn list_rooms(
        &self,
        connection_id: &ConnectionId,
    ) -> Result<Vec<RoomSummary>, ChatError> {
        self.authorize(connection_id).await?;
        self.snapshot().await
    }

    /// ルームを強制削除する
    ///
    /// 参加者全員に `eviction_notice` を送って切断し、インメモリのエントリを削除してから
    /// 永続ストアのメッセージ、ルームの順に削除する。
    pub async fn delete_room(
        &self,
        connection_id: &ConnectionId,
        room_id: &RoomId,
        eviction_notice: &str,
    ) -> Result<RoomDeletion, ChatError> {
        self.authorize(connection_id).await?;

        if self.bridge.find_room(room_id).await?.is_none() {
            return Err(ChatError::RoomNotFound);
        }

        let evicted = self.registry.evict_room(room_id).await;
        for participant in &evicted {
            let target = &participant.connection_id;
            if let Err(e) = self.message_pusher.push_to(target, eviction_notice).await {
                tracing::warn!("Failed to notify evicted connection {}: {}", target, e);
            }
            if let Err(e) = self.message_pusher.close(target).await {
                tracing::warn!("Failed to close evicted connection {}: {}", target, e);
            }
        }

        self.bridge.delete_room(room_id).await?;
        tracing::info!(
            "Room {} deleted by admin {} ({} participant(s) evicted)",
            room_id,
            connection_id,
            evicted.len()
        );

        Ok(RoomDeletion {
            room_id: room_id.clone(),
            evicted: evicted.len(),
            notify: self.sessions.others(connection_id).await,
        })
    }

    async fn authorize(&self, connection_id: &ConnectionId) -> Result<(), ChatError> {
        if self.sessions.is_admin(connection_id).await {
            Ok(())
        } else {
            tracing::warn!("Unauthorized admin request from {}", connection_id);
            Err(ChatError::Unauthorized)
        }
    }
}

/// Compare without short-circuiting on the first differing byte.
fn secrets_match(provided: &str, expected: &str) -> bool {
    provided.as_bytes().ct_eq(expected.as_bytes()).into()
}
