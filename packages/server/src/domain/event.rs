//! Events pushed from the server to a session's outbox.

use std::time::Duration;

use super::{
    entity::{ChatMessage, Delivery},
    value_object::{Timestamp, Username},
};

/// セッションの outbox に積まれるサーバー発のイベント
///
/// ワイヤ上の表現は Infrastructure 層の DTO が決める。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    /// 待機キュー内の現在位置と推定待ち時間
    QueuePosition {
        position: usize,
        estimated_wait: Duration,
    },
    /// Active になった
    Admitted { username: Username },
    /// 他のセッションからのチャットメッセージ
    Message(Delivery),
    /// 通知音の合図（ミュート中は送られない）
    Notify {
        from: Username,
        delivered_at: Timestamp,
    },
    /// 送信者への受付確認
    Ack {
        sent_at: Timestamp,
        delivered_to: usize,
    },
    /// ストアへの書き込みが確認できなかった
    DeliveryUnconfirmed { sent_at: Timestamp, reason: String },
    /// セッションの操作が拒否された
    Rejected { code: RejectCode, message: String },
    ParticipantJoined { username: Username, at: Timestamp },
    ParticipantLeft { username: Username, at: Timestamp },
    /// Active になった直後に送られる直近の履歴
    History(Vec<ChatMessage>),
    Shutdown,
}

/// 拒否理由
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectCode {
    NotActive,
    InvalidMessage,
    AuthExhausted,
    AuthTimeout,
    InvalidFrame,
}

impl RejectCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotActive => "not-active",
            Self::InvalidMessage => "invalid-message",
            Self::AuthExhausted => "auth-exhausted",
            Self::AuthTimeout => "auth-timeout",
            Self::InvalidFrame => "invalid-frame",
        }
    }
}
