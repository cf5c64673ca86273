//! MessagePusher trait 定義
//!
//! クライアントへのメッセージ送信（通知）を抽象化します。
//! WebSocket などの具体的な通信手段は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::{ConnectionId, MessagePushError};

/// A frame queued for one connection's writer task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushFrame {
    /// JSON text frame
    Text(String),
    /// Close the connection after everything queued before it
    Close,
}

/// Channel into one connection's writer task
pub type PusherChannel = mpsc::UnboundedSender<PushFrame>;

/// MessagePusher trait
///
/// UseCase 層と UI 層はこの trait に依存し、送信手段の詳細には依存しない。
#[async_trait]
pub trait MessagePusher: Send + Sync {
    async fn register_client(&self, connection_id: ConnectionId, sender: PusherChannel);

    async fn unregister_client(&self, connection_id: &ConnectionId);

    /// Send to a single connection
    async fn push_to(
        &self,
        connection_id: &ConnectionId,
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// Send to several connections; individual failures are logged and skipped
    async fn broadcast(
        &self,
        targets: &[ConnectionId],
        content: &str,
    ) -> Result<(), MessagePushError>;

    /// Ask a connection's writer task to close the socket
    async fn close(&self, connection_id: &ConnectionId) -> Result<(), MessagePushError>;
}
