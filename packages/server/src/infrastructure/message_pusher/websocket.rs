//! WebSocket を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - 接続ごとの `PusherChannel` を ConnectionId で管理
//! - 単一接続への送信、複数接続へのブロードキャスト、切断要求
//!
//! WebSocket の受付と writer タスクの生成は UI 層（`ui/handler/websocket.rs`）が行い、
//! ここでは生成済みのチャネルだけを扱う。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{ConnectionId, MessagePushError, MessagePusher, PushFrame, PusherChannel};

/// WebSocket を使った MessagePusher 実装
#[derive(Default)]
pub struct WebSocketMessagePusher {
    clients: RwLock<HashMap<ConnectionId, PusherChannel>>,
}

impl WebSocketMessagePusher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered connections
    pub async fn client_count(&self) -> usize {
        self.clients.read().await.len()
    }

    async fn send_frame(
        &self,
        connection_id: &ConnectionId,
        frame: PushFrame,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.read().await;
        let sender = clients
            .get(connection_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(connection_id.to_string()))?;
        sender
            .send(frame)
            .map_err(|e| MessagePushError::PushFailed(e.to_string()))
    }
}

#[async_trait]
impl MessagePusher for WebSocketMessagePusher {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel) {
        self.clients.write().await.insert(connection_id, sender);
        tracing::debug!("Connection '{}' registered to MessagePusher", connection_id);
    }

    async fn unregister_client(&self, connection_id: &ConnectionId) {
        self.clients.write().await.remove(connection_id);
        tracing::debug!("Connection '{}' unregistered from MessagePusher", connection_id);
    }

    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError> {
        self.send_frame(connection_id, PushFrame::Text(content.to_string()))
            .await?;
        tracing::debug!("Pushed message to connection '{}'", connection_id);
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        content: &str,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.read().await;

        for target in targets {
            let Some(sender) = clients.get(target) else {
                tracing::warn!("Connection '{}' not found during broadcast, skipping", target);
                continue;
            };
            // 一部の送信失敗は許容する
            if let Err(e) = sender.send(PushFrame::Text(content.to_string())) {
                tracing::warn!("Failed to push message to connection '{}': {}", target, e);
            }
        }

        Ok(())
    }

    async fn close(&self, connection_id: &ConnectionId) -> Result<(), MessagePushError> {
        self.send_frame(connection_id, PushFrame::Close).await?;
        tracing::debug!("Requested close for connection '{}'", connection_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - push_to: 特定の接続への送信
    // - broadcast: 複数接続への送信と部分失敗の許容
    // - close: 切断フレームの送信
    //
    // 【どのようなシナリオをテストするか】
    // 1. push_to の成功ケースと未登録接続へのエラー
    // 2. broadcast の成功ケースと一部の接続が存在しないケース
    // 3. 登録解除後は送信されないこと
    // 4. close は送信済みテキストの後ろに Close が並ぶこと
    // ========================================

    async fn register(
        pusher: &WebSocketMessagePusher,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<PushFrame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let connection_id = ConnectionId::generate();
        pusher.register_client(connection_id, tx).await;
        (connection_id, rx)
    }

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 特定の接続にメッセージを送信できる
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, mut rx) = register(&pusher).await;

        // when (操作):
        let result = pusher.push_to(&alice, "Hello").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some(PushFrame::Text("Hello".to_string())));
    }

    #[tokio::test]
    async fn test_push_to_client_not_found() {
        // テスト項目: 未登録の接続への送信はエラーを返す
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();

        // when (操作):
        let result = pusher.push_to(&ConnectionId::generate(), "Hello").await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::ClientNotFound(_))));
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure() {
        // テスト項目: 一部の接続が存在しなくてもブロードキャストは成功する
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, mut rx1) = register(&pusher).await;
        let (bob, mut rx2) = register(&pusher).await;
        let ghost = ConnectionId::generate();

        // when (操作):
        let result = pusher.broadcast(&[alice, ghost, bob], "Broadcast").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx1.recv().await, Some(PushFrame::Text("Broadcast".to_string())));
        assert_eq!(rx2.recv().await, Some(PushFrame::Text("Broadcast".to_string())));
    }

    #[tokio::test]
    async fn test_broadcast_tolerates_dropped_receiver() {
        // テスト項目: writer タスクが終了済みの接続があっても他へは届く
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, rx1) = register(&pusher).await;
        let (bob, mut rx2) = register(&pusher).await;
        drop(rx1);

        // when (操作):
        let result = pusher.broadcast(&[alice, bob], "still here").await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx2.recv().await, Some(PushFrame::Text("still here".to_string())));
    }

    #[tokio::test]
    async fn test_unregister_client() {
        // テスト項目: 登録解除した接続には送信できない
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, _rx) = register(&pusher).await;

        // when (操作):
        pusher.unregister_client(&alice).await;

        // then (期待する結果):
        assert_eq!(pusher.client_count().await, 0);
        assert!(pusher.push_to(&alice, "Hello").await.is_err());
    }

    #[tokio::test]
    async fn test_close_is_queued_after_pending_text() {
        // テスト項目: close は既に積まれたテキストの後に Close フレームを積む
        // given (前提条件):
        let pusher = WebSocketMessagePusher::new();
        let (alice, mut rx) = register(&pusher).await;
        pusher.push_to(&alice, "bye").await.unwrap();

        // when (操作):
        let result = pusher.close(&alice).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Some(PushFrame::Text("bye".to_string())));
        assert_eq!(rx.recv().await, Some(PushFrame::Close));
    }
}
