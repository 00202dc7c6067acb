//! 直近のメッセージ窓
//!
//! Active になったセッションに再送する履歴。受付制御と同じロックの内側で更新するため、
//! 再送される履歴とライブ配送がちょうど受付の時点で分かれる。

use std::collections::VecDeque;

use super::entity::ChatMessage;

/// 直近 `limit` 件のメッセージ（古い順）
#[derive(Debug, Clone, Default)]
pub struct RecentMessages {
    limit: usize,
    messages: VecDeque<ChatMessage>,
}

impl RecentMessages {
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            messages: VecDeque::with_capacity(limit),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 末尾に追加し、上限を超えた分を先頭から捨てる
    pub fn push(&mut self, message: ChatMessage) {
        if self.limit == 0 {
            return;
        }
        self.messages.push_back(message);
        while self.messages.len() > self.limit {
            self.messages.pop_front();
        }
    }

    /// 既存の窓より古いメッセージを先頭側に補う（起動時のストアからの読み込み）
    pub fn seed(&mut self, older: Vec<ChatMessage>) {
        let room = self.limit.saturating_sub(self.messages.len());
        let skip = older.len().saturating_sub(room);
        for message in older.into_iter().skip(skip).rev() {
            self.messages.push_front(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn to_vec(&self) -> Vec<ChatMessage> {
        self.messages.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{MessageBody, Timestamp, Username};

    fn message(body: &str, sent_at: i64) -> ChatMessage {
        ChatMessage::new(
            Username::new("alice".to_string()).unwrap(),
            MessageBody::new(body.to_string()).unwrap(),
            Timestamp::new(sent_at),
        )
    }

    fn bodies(recent: &RecentMessages) -> Vec<String> {
        recent
            .to_vec()
            .into_iter()
            .map(|m| m.body.as_str().to_string())
            .collect()
    }

    #[test]
    fn test_push_keeps_latest_within_limit() {
        // テスト項目: 上限を超えると古いものから捨てられる
        // given (前提条件):
        let mut recent = RecentMessages::new(2);

        // when (操作):
        recent.push(message("one", 1));
        recent.push(message("two", 2));
        recent.push(message("three", 3));

        // then (期待する結果):
        assert_eq!(bodies(&recent), vec!["two", "three"]);
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        // テスト項目: 上限 0 なら何も保持しない
        let mut recent = RecentMessages::new(0);
        recent.push(message("one", 1));
        recent.seed(vec![message("zero", 0)]);
        assert!(recent.is_empty());
    }

    #[test]
    fn test_seed_fills_older_side_only() {
        // テスト項目: 読み込んだ履歴は既存の窓より前に、空きの分だけ入る
        // given (前提条件):
        let mut recent = RecentMessages::new(3);
        recent.push(message("live", 10));

        // when (操作):
        recent.seed(vec![message("a", 1), message("b", 2), message("c", 3)]);

        // then (期待する結果):
        assert_eq!(bodies(&recent), vec!["b", "c", "live"]);
    }
}
