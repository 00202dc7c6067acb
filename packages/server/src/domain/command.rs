//! In-band session commands

use super::{error::ValueObjectError, value_object::MessageBody};

/// セッションから届いた 1 行の解釈結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    /// 他の Active セッションへ配送するチャット本文
    Chat(MessageBody),
    Mute,
    Unmute,
    Exit,
}

impl SessionCommand {
    /// 入力行を解釈する
    ///
    /// `/mute` `/unmute` `/exit` は大文字小文字と前後の空白を無視して判定する。
    /// それ以外はチャット本文として検証する。
    pub fn parse(line: &str) -> Result<Self, ValueObjectError> {
        let trimmed = line.trim();
        if trimmed.eq_ignore_ascii_case("/mute") {
            Ok(Self::Mute)
        } else if trimmed.eq_ignore_ascii_case("/unmute") {
            Ok(Self::Unmute)
        } else if trimmed.eq_ignore_ascii_case("/exit") {
            Ok(Self::Exit)
        } else {
            MessageBody::new(line.to_string()).map(Self::Chat)
        }
    }
}
