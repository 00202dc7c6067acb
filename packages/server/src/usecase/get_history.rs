//! UseCase: 履歴の取得

use std::sync::Arc;

use crate::domain::{ChatMessage, MessageStore, StoreError};

pub struct GetHistoryUseCase {
    store: Arc<dyn MessageStore>,
}

impl GetHistoryUseCase {
    pub fn new(store: Arc<dyn MessageStore>) -> Self {
        Self { store }
    }

    /// 直近 `limit` 件を古い順に取得
    pub async fn execute(&self, limit: usize) -> Result<Vec<ChatMessage>, StoreError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.store.query_history(limit).await
    }
}
