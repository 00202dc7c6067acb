//! Domain entities

use serde::{Deserialize, Serialize};

use super::value_object::{MessageBody, SessionId, Timestamp, Username};

/// セッションの状態
///
/// 待機中の位置は `Waiting` のときだけ存在し、Active 専用の権限を持つ待機セッションは表現できない。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 待機キューに並んでいる（1 始まりの位置）
    Waiting { position: usize },
    /// チャットの送受信が許可されている
    Active,
    /// 切断・`/exit`・サーバー停止により終了した
    Closed,
}

/// 認証済みクライアント 1 接続分のセッション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: SessionId,
    pub username: Username,
    pub state: SessionState,
    /// 通知音の抑制フラグ
    pub muted: bool,
    pub created_at: Timestamp,
}

impl Session {
    /// 認証直後のセッションを作成（状態は受付制御が決める）
    pub fn new(id: SessionId, username: Username, created_at: Timestamp) -> Self {
        Self {
            id,
            username,
            state: SessionState::Closed,
            muted: false,
            created_at,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    /// 待機中であればキュー内の位置を返す
    pub fn queue_position(&self) -> Option<usize> {
        match self.state {
            SessionState::Waiting { position } => Some(position),
            _ => None,
        }
    }
}

/// Message Router が受け付けたチャットメッセージ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub from: Username,
    pub body: MessageBody,
    /// Router が受け付けた時刻
    pub sent_at: Timestamp,
}

impl ChatMessage {
    pub fn new(from: Username, body: MessageBody, sent_at: Timestamp) -> Self {
        Self {
            from,
            body,
            sent_at,
        }
    }
}

/// 受信者ごとの配送
///
/// `sent_at` はメッセージで共通だが、`delivered_at` は受信者ごとに異なる。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub message: ChatMessage,
    pub delivered_at: Timestamp,
    /// 受信者がミュートしていなければ true（クライアント側で通知音を鳴らす）
    pub audible: bool,
}
