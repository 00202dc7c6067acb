//! MessagePusher trait 定義
//!
//! セッションへのイベント送信（通知）のインターフェース。
//! 具体的な実装（per-session outbox）は Infrastructure 層が提供します。

use async_trait::async_trait;
use tokio::sync::broadcast;

use super::{error::MessagePushError, event::ServerEvent, value_object::SessionId};

/// セッションごとの outbox の送信側
///
/// 容量付きの broadcast チャンネル。送信は決してブロックせず、
/// 受信側が遅れた場合は古いイベントから捨てられる。
pub type PusherChannel = broadcast::Sender<ServerEvent>;

/// セッションへのイベント送信
#[async_trait]
pub trait MessagePusher: Send + Sync {
    /// セッションの outbox を登録
    async fn register_client(&self, session_id: SessionId, sender: PusherChannel);

    /// セッションの outbox を登録解除
    async fn unregister_client(&self, session_id: &SessionId);

    /// 特定のセッションにイベントを送信
    async fn push_to(
        &self,
        session_id: &SessionId,
        event: ServerEvent,
    ) -> Result<(), MessagePushError>;

    /// 複数のセッションにイベントを送信
    ///
    /// 一部の送信失敗は許容し、失敗したセッションとエラーを返す。
    async fn broadcast(
        &self,
        targets: &[SessionId],
        event: ServerEvent,
    ) -> Vec<(SessionId, MessagePushError)>;
}
