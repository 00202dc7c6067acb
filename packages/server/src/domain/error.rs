//! Domain errors

use thiserror::Error;

use super::value_object::Username;

/// 値オブジェクトの検証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("username must not be empty")]
    UsernameEmpty,

    #[error("username must not contain whitespace")]
    UsernameContainsWhitespace,

    #[error("username is too long ({actual} > {max} characters)")]
    UsernameTooLong { max: usize, actual: usize },

    #[error("message body must not be empty")]
    MessageBodyEmpty,

    #[error("message body is too long ({actual} > {max} characters)")]
    MessageBodyTooLong { max: usize, actual: usize },
}

/// Auth Gateway が返す認証エラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,

    #[error("username '{0}' is already taken")]
    UsernameTaken(String),

    #[error("authentication backend unavailable: {0}")]
    Unavailable(String),
}

/// Message Store の書き込み・読み出しエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("message store write failed: {0}")]
    WriteFailed(String),

    #[error("message store read failed: {0}")]
    ReadFailed(String),
}

/// 受付制御のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AdmissionError {
    #[error("user '{0}' already has a live session")]
    AlreadyConnected(Username),

    #[error("server is shutting down")]
    ShuttingDown,
}

/// MessagePusher のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("session '{0}' is not registered")]
    ClientNotFound(String),

    #[error("outbox of session '{0}' is closed")]
    ChannelClosed(String),
}
