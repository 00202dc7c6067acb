//! 外部コラボレーターの trait 定義
//!
//! 認証と永続化はこのシステムのコアではないため、ドメイン層は trait だけを定義し、
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{
    entity::ChatMessage,
    error::{AuthError, StoreError},
    value_object::{MessageBody, Timestamp, Username},
};

/// Auth Gateway
///
/// 資格情報の保存形式（ハッシュ化など）は実装側の関心事。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// 新規ユーザーを登録
    async fn register(&self, username: &Username, password: &str) -> Result<(), AuthError>;

    /// 既存ユーザーの資格情報を検証
    async fn login(&self, username: &Username, password: &str) -> Result<(), AuthError>;
}

/// Message Store
///
/// 追記と履歴の読み出しのみを行い、順序付けのロジックは持たない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// メッセージを追記
    async fn append(
        &self,
        sender: &Username,
        body: &MessageBody,
        sent_at: Timestamp,
    ) -> Result<(), StoreError>;

    /// 直近 `limit` 件の履歴を古い順に取得
    async fn query_history(&self, limit: usize) -> Result<Vec<ChatMessage>, StoreError>;
}
