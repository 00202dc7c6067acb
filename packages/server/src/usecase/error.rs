//! UseCase errors

use thiserror::Error;

use crate::domain::{AdmissionError, AuthError, Timestamp, ValueObjectError};

/// 認証のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthenticateError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("invalid username: {0}")]
    InvalidUsername(#[from] ValueObjectError),

    #[error("user '{0}' already has a live session")]
    AlreadyConnected(String),
}

impl AuthenticateError {
    /// クライアントに返す理由コード
    pub fn reason_code(&self) -> &'static str {
        match self {
            Self::Auth(AuthError::InvalidCredentials) => "invalid-credentials",
            Self::Auth(AuthError::UsernameTaken(_)) => "username-taken",
            Self::Auth(AuthError::Unavailable(_)) => "auth-unavailable",
            Self::InvalidUsername(_) => "invalid-username",
            Self::AlreadyConnected(_) => "already-connected",
        }
    }
}

/// セッション受付のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("user '{0}' already has a live session")]
    AlreadyConnected(String),

    #[error("server is shutting down")]
    ShuttingDown,
}

impl From<AdmissionError> for ConnectError {
    fn from(error: AdmissionError) -> Self {
        match error {
            AdmissionError::AlreadyConnected(username) => {
                Self::AlreadyConnected(username.into_string())
            }
            AdmissionError::ShuttingDown => Self::ShuttingDown,
        }
    }
}

/// メッセージルーティングのエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    /// 送信者がまだ Active ではない（待機中）
    #[error("session is not active")]
    NotActive,

    /// 送信者のセッションが既に終了している
    #[error("session is closed")]
    SessionClosed,

    /// 配送は行ったがストアへの書き込みが確認できなかった
    #[error("message delivered to {delivered_to} session(s) but not persisted: {reason}")]
    Unpersisted {
        sent_at: Timestamp,
        delivered_to: usize,
        reason: String,
    },
}
