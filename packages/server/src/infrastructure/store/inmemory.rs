//! InMemory Message Store 実装

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{ChatMessage, MessageBody, MessageStore, StoreError, Timestamp, Username};

/// インメモリ Message Store 実装
pub struct InMemoryMessageStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl InMemoryMessageStore {
    pub fn new() -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
        }
    }

    /// 保存済みメッセージ数
    pub async fn len(&self) -> usize {
        self.messages.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.messages.lock().await.is_empty()
    }
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn append(
        &self,
        sender: &Username,
        body: &MessageBody,
        sent_at: Timestamp,
    ) -> Result<(), StoreError> {
        let mut messages = self.messages.lock().await;
        messages.push(ChatMessage::new(sender.clone(), body.clone(), sent_at));
        Ok(())
    }

    async fn query_history(&self, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        let messages = self.messages.lock().await;
        let start = messages.len().saturating_sub(limit);
        Ok(messages[start..].to_vec())
    }
}
