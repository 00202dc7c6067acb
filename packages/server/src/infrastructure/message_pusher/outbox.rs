//! Outbox を使った MessagePusher 実装
//!
//! ## 責務
//!
//! - セッションごとの outbox 送信側（`PusherChannel`）を管理
//! - セッションへのイベント送信（push_to, broadcast）
//!
//! ## 設計ノート
//!
//! outbox は `tokio::sync::broadcast` の容量付きチャンネル。送信は常に即座に返り、
//! 書き込みの遅いクライアントは古いイベントから取りこぼす（drop-oldest）。
//! 受信側は UI 層の writer ループが持ち、`Lagged` を検知してログに残す。

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{Mutex, broadcast};

use crate::domain::{MessagePushError, MessagePusher, PusherChannel, ServerEvent, SessionId};

/// 新しい outbox を作成
///
/// 容量 0 は broadcast チャンネルが受け付けないため 1 に切り上げる。
pub fn outbox_channel(capacity: usize) -> (PusherChannel, broadcast::Receiver<ServerEvent>) {
    broadcast::channel(capacity.max(1))
}

/// Outbox を使った MessagePusher 実装
pub struct OutboxMessagePusher {
    /// 接続中のセッションの outbox 送信側
    clients: Mutex<HashMap<SessionId, PusherChannel>>,
}

impl OutboxMessagePusher {
    pub fn new() -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for OutboxMessagePusher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagePusher for OutboxMessagePusher {
    async fn register_client(&self, session_id: SessionId, sender: PusherChannel) {
        let mut clients = self.clients.lock().await;
        clients.insert(session_id, sender);
        tracing::debug!("Session '{}' registered to MessagePusher", session_id);
    }

    async fn unregister_client(&self, session_id: &SessionId) {
        let mut clients = self.clients.lock().await;
        clients.remove(session_id);
        tracing::debug!("Session '{}' unregistered from MessagePusher", session_id);
    }

    async fn push_to(
        &self,
        session_id: &SessionId,
        event: ServerEvent,
    ) -> Result<(), MessagePushError> {
        let clients = self.clients.lock().await;

        let sender = clients
            .get(session_id)
            .ok_or_else(|| MessagePushError::ClientNotFound(session_id.to_string()))?;
        sender
            .send(event)
            .map_err(|_| MessagePushError::ChannelClosed(session_id.to_string()))?;
        Ok(())
    }

    async fn broadcast(
        &self,
        targets: &[SessionId],
        event: ServerEvent,
    ) -> Vec<(SessionId, MessagePushError)> {
        let clients = self.clients.lock().await;
        let mut failures = Vec::new();

        for target in targets {
            let result = match clients.get(target) {
                Some(sender) => sender
                    .send(event.clone())
                    .map(|_| ())
                    .map_err(|_| MessagePushError::ChannelClosed(target.to_string())),
                None => Err(MessagePushError::ClientNotFound(target.to_string())),
            };
            // ブロードキャストでは一部の送信失敗を許容
            if let Err(e) = result {
                tracing::warn!("Failed to push event to session '{}': {}", target, e);
                failures.push((*target, e));
            }
        }

        failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::RecvError;

    #[tokio::test]
    async fn test_push_to_success() {
        // テスト項目: 登録済みセッションの outbox にイベントが届く
        // given (前提条件):
        let pusher = OutboxMessagePusher::new();
        let (tx, mut rx) = outbox_channel(8);
        let session_id = SessionId::generate();
        pusher.register_client(session_id, tx).await;

        // when (操作):
        let result = pusher.push_to(&session_id, ServerEvent::Shutdown).await;

        // then (期待する結果):
        assert!(result.is_ok());
        assert_eq!(rx.recv().await, Ok(ServerEvent::Shutdown));
    }

    #[tokio::test]
    async fn test_push_to_client_not_found() {
        // テスト項目: 未登録セッションへの送信は ClientNotFound になる
        // given (前提条件):
        let pusher = OutboxMessagePusher::new();

        // when (操作):
        let result = pusher
            .push_to(&SessionId::generate(), ServerEvent::Shutdown)
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::ClientNotFound(_))));
    }

    #[tokio::test]
    async fn test_push_to_closed_outbox() {
        // テスト項目: 受信側が破棄された outbox への送信は ChannelClosed になる
        // given (前提条件):
        let pusher = OutboxMessagePusher::new();
        let (tx, rx) = outbox_channel(8);
        let session_id = SessionId::generate();
        pusher.register_client(session_id, tx).await;
        drop(rx);

        // when (操作):
        let result = pusher.push_to(&session_id, ServerEvent::Shutdown).await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::ChannelClosed(_))));
    }

    #[tokio::test]
    async fn test_slow_receiver_drops_oldest() {
        // テスト項目: outbox が溢れると古いイベントから捨てられ、送信はブロックしない
        // given (前提条件):
        let pusher = OutboxMessagePusher::new();
        let (tx, mut rx) = outbox_channel(2);
        let session_id = SessionId::generate();
        pusher.register_client(session_id, tx).await;

        // when (操作):
        for delivered_to in 0..5 {
            let event = ServerEvent::Ack {
                sent_at: crate::domain::Timestamp::new(0),
                delivered_to,
            };
            pusher.push_to(&session_id, event).await.unwrap();
        }

        // then (期待する結果):
        assert_eq!(rx.recv().await, Err(RecvError::Lagged(3)));
        assert!(matches!(
            rx.recv().await,
            Ok(ServerEvent::Ack { delivered_to: 3, .. })
        ));
        assert!(matches!(
            rx.recv().await,
            Ok(ServerEvent::Ack { delivered_to: 4, .. })
        ));
    }

    #[tokio::test]
    async fn test_broadcast_partial_failure() {
        // テスト項目: ブロードキャストは一部の失敗を許容し、失敗したセッションだけを返す
        // given (前提条件):
        let pusher = OutboxMessagePusher::new();
        let (tx, mut rx) = outbox_channel(8);
        let alive = SessionId::generate();
        let missing = SessionId::generate();
        pusher.register_client(alive, tx).await;

        // when (操作):
        let failures = pusher
            .broadcast(&[alive, missing], ServerEvent::Shutdown)
            .await;

        // then (期待する結果):
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, missing);
        assert_eq!(rx.recv().await, Ok(ServerEvent::Shutdown));
    }

    #[tokio::test]
    async fn test_unregister_client() {
        // テスト項目: 登録解除後のセッションには送信できない
        // given (前提条件):
        let pusher = OutboxMessagePusher::new();
        let (tx, _rx) = outbox_channel(8);
        let session_id = SessionId::generate();
        pusher.register_client(session_id, tx).await;

        // when (操作):
        pusher.unregister_client(&session_id).await;
        let result = pusher.push_to(&session_id, ServerEvent::Shutdown).await;

        // then (期待する結果):
        assert!(matches!(result, Err(MessagePushError::ClientNotFound(_))));
    }
}
