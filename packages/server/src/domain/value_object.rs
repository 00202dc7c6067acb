//! Value objects
//!
//! 生成時に検証を行い、不正な値を持つインスタンスが存在しないことを保証します。

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::ValueObjectError;

/// ユーザー名の最大文字数
pub const USERNAME_MAX_CHARS: usize = 32;

/// メッセージ本文の最大文字数
pub const MESSAGE_BODY_MAX_CHARS: usize = 2000;

/// セッション ID
///
/// サーバー内部でのみ使用する識別子。同じユーザー名で再接続しても別の ID になる。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// 新しいセッション ID を生成
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// 認証済みユーザーのハンドル
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Username(String);

impl Username {
    /// ユーザー名を検証して生成
    ///
    /// 空文字・空白を含む文字列・[`USERNAME_MAX_CHARS`] を超える文字列は拒否する。
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.is_empty() {
            return Err(ValueObjectError::UsernameEmpty);
        }
        if value.chars().any(char::is_whitespace) {
            return Err(ValueObjectError::UsernameContainsWhitespace);
        }
        let length = value.chars().count();
        if length > USERNAME_MAX_CHARS {
            return Err(ValueObjectError::UsernameTooLong {
                max: USERNAME_MAX_CHARS,
                actual: length,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for Username {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// チャットメッセージ本文
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageBody(String);

impl MessageBody {
    /// 本文を検証して生成
    ///
    /// 空白のみの本文と [`MESSAGE_BODY_MAX_CHARS`] を超える本文は拒否する。
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::MessageBodyEmpty);
        }
        let length = value.chars().count();
        if length > MESSAGE_BODY_MAX_CHARS {
            return Err(ValueObjectError::MessageBodyTooLong {
                max: MESSAGE_BODY_MAX_CHARS,
                actual: length,
            });
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for MessageBody {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix epoch ミリ秒のタイムスタンプ
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(millis: i64) -> Self {
        Self(millis)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}
