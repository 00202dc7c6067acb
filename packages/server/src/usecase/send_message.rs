//! UseCase: メッセージ送信（Message Router）
//!
//! ## 処理の流れ
//!
//! 1. 送信者が Active であることを確認（待機中なら NotActive）
//! 2. 現在時刻を `sent_at` としてメッセージストアに追記
//! 3. 送信者が書き込み中に終了していないかを再確認し、配送先を確定して直近の窓に記録
//! 4. 送信者以外の Active セッションに並行して配送
//! 5. 送信者に `ack`（ストア失敗時は `warning`）を返す
//!
//! ## 順序保証
//!
//! 1 セッションの受信ループは 1 行ずつ `execute` を待つため、同じ送信者のメッセージは
//! 全ての受信者に送信順で届く（per-sender FIFO）。
//! 異なる送信者間の順序は到着順の best-effort で、全体の線形化はしない。

use std::sync::Arc;

use futures_util::future::join_all;
use luconnect_shared::time::Clock;

use crate::domain::{
    ChatMessage, MessageBody, MessagePusher, MessageStore, ServerEvent, SessionId, Timestamp,
    Username,
};

use super::{admission::AdmissionController, error::RouteError, notification::NotificationDispatcher};

/// 配送結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteReceipt {
    pub sent_at: Timestamp,
    /// 配送できた受信者
    pub delivered_to: Vec<Username>,
}

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    admission: Arc<AdmissionController>,
    store: Arc<dyn MessageStore>,
    dispatcher: Arc<NotificationDispatcher>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl SendMessageUseCase {
    pub fn new(
        admission: Arc<AdmissionController>,
        store: Arc<dyn MessageStore>,
        dispatcher: Arc<NotificationDispatcher>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            admission,
            store,
            dispatcher,
            message_pusher,
            clock,
        }
    }

    /// メッセージをルーティングする
    ///
    /// ストアへの書き込みに失敗しても配送は行い、`RouteError::Unpersisted` を返す。
    pub async fn execute(
        &self,
        sender: SessionId,
        body: MessageBody,
    ) -> Result<RouteReceipt, RouteError> {
        let from = self.admission.active_username(&sender).await?;
        let sent_at = Timestamp::new(self.clock.now_millis());

        let store_result = self.store.append(&from, &body, sent_at).await;
        if let Err(e) = &store_result {
            tracing::warn!("Failed to persist message from '{}': {}", from, e);
        }

        // 書き込み中に送信者が終了していたら配送しない。
        // 配送先の確定と直近の窓への記録は受付と同じロックの内側で行う
        let message = ChatMessage::new(from.clone(), body, sent_at);
        let recipients = self.admission.commit_message(&sender, &message).await?;
        let results = join_all(
            recipients
                .iter()
                .map(|recipient| self.dispatcher.notify(recipient, &message)),
        )
        .await;

        let mut delivered_to = Vec::with_capacity(recipients.len());
        for (recipient, result) in recipients.into_iter().zip(results) {
            match result {
                Ok(_) => delivered_to.push(recipient.username),
                Err(e) => {
                    tracing::warn!(
                        "Failed to deliver message from '{}' to '{}': {}",
                        from,
                        recipient.username,
                        e
                    );
                }
            }
        }
        tracing::info!(
            "Routed message from '{}' to {} session(s)",
            from,
            delivered_to.len()
        );

        match store_result {
            Ok(()) => {
                let ack = ServerEvent::Ack {
                    sent_at,
                    delivered_to: delivered_to.len(),
                };
                self.push_to_sender(&sender, ack).await;
                Ok(RouteReceipt {
                    sent_at,
                    delivered_to,
                })
            }
            Err(e) => {
                let warning = ServerEvent::DeliveryUnconfirmed {
                    sent_at,
                    reason: e.to_string(),
                };
                self.push_to_sender(&sender, warning).await;
                Err(RouteError::Unpersisted {
                    sent_at,
                    delivered_to: delivered_to.len(),
                    reason: e.to_string(),
                })
            }
        }
    }

    async fn push_to_sender(&self, sender: &SessionId, event: ServerEvent) {
        if let Err(e) = self.message_pusher.push_to(sender, event).await {
            tracing::debug!("Sender '{}' is gone before receiving ack: {}", sender, e);
        }
    }
}
