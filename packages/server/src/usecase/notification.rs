//! Notification Dispatcher
//!
//! 受信者ごとの配送時刻を決め、メッセージ本体と（ミュートしていなければ）通知音の合図を
//! 受信者の outbox に積みます。

use std::sync::Arc;

use luconnect_shared::time::Clock;

use crate::domain::{
    ChatMessage, Delivery, MessagePushError, MessagePusher, Recipient, ServerEvent, Timestamp,
};

pub struct NotificationDispatcher {
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl NotificationDispatcher {
    pub fn new(message_pusher: Arc<dyn MessagePusher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            message_pusher,
            clock,
        }
    }

    /// 1 人の受信者にメッセージを配送し、配送時刻を返す
    ///
    /// 配送時刻は送信時刻より前にならない。
    pub async fn notify(
        &self,
        recipient: &Recipient,
        message: &ChatMessage,
    ) -> Result<Timestamp, MessagePushError> {
        let delivered_at = Timestamp::new(self.clock.now_millis()).max(message.sent_at);
        let audible = !recipient.muted;

        let delivery = Delivery {
            message: message.clone(),
            delivered_at,
            audible,
        };
        self.message_pusher
            .push_to(&recipient.session_id, ServerEvent::Message(delivery))
            .await?;

        if audible {
            let notify = ServerEvent::Notify {
                from: message.from.clone(),
                delivered_at,
            };
            self.message_pusher
                .push_to(&recipient.session_id, notify)
                .await?;
        }

        tracing::debug!(
            "Delivered message from '{}' to '{}' (audible: {})",
            message.from,
            recipient.username,
            audible
        );
        Ok(delivered_at)
    }
}
