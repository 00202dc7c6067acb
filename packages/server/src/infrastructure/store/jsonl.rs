//! JSON Lines ファイルを使った Message Store 実装
//!
//! 1 メッセージを 1 行の JSON として追記する。プロセスを再起動しても履歴が残る。

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{fs::OpenOptions, io::AsyncWriteExt, sync::Mutex};

use crate::domain::{ChatMessage, MessageBody, MessageStore, StoreError, Timestamp, Username};

/// ファイル上の 1 行分の表現
#[derive(Debug, Serialize, Deserialize)]
struct StoredMessage {
    from: String,
    body: String,
    sent_at: i64,
}

impl TryFrom<StoredMessage> for ChatMessage {
    type Error = String;

    fn try_from(stored: StoredMessage) -> Result<Self, Self::Error> {
        let from = Username::new(stored.from).map_err(|e| e.to_string())?;
        let body = MessageBody::new(stored.body).map_err(|e| e.to_string())?;
        Ok(ChatMessage::new(from, body, Timestamp::new(stored.sent_at)))
    }
}

/// JSON Lines Message Store 実装
pub struct JsonLinesMessageStore {
    path: PathBuf,
    /// 追記を直列化する
    write_lock: Mutex<()>,
}

impl JsonLinesMessageStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl MessageStore for JsonLinesMessageStore {
    async fn append(
        &self,
        sender: &Username,
        body: &MessageBody,
        sent_at: Timestamp,
    ) -> Result<(), StoreError> {
        let record = StoredMessage {
            from: sender.as_str().to_string(),
            body: body.as_str().to_string(),
            sent_at: sent_at.value(),
        };
        let mut line =
            serde_json::to_string(&record).map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        file.flush()
            .await
            .map_err(|e| StoreError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    async fn query_history(&self, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::ReadFailed(e.to_string())),
        };

        let mut messages: Vec<ChatMessage> = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let parsed = serde_json::from_str::<StoredMessage>(line)
                .map_err(|e| e.to_string())
                .and_then(ChatMessage::try_from);
            match parsed {
                Ok(message) => messages.push(message),
                Err(e) => tracing::warn!(
                    "Skipping corrupt history line {} in {}: {}",
                    line_no + 1,
                    self.path.display(),
                    e
                ),
            }
        }

        let start = messages.len().saturating_sub(limit);
        Ok(messages.split_off(start))
    }
}
