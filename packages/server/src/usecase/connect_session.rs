//! UseCase: セッションの受付
//!
//! 直近の履歴は受付と同じロックの内側で `admitted` の直後に積まれます。
//! このユースケースは起動時にストアから窓を読み込む役も持ちます。

use std::sync::Arc;

use crate::domain::{AdmissionResult, PusherChannel, SessionId, Username};

use super::{admission::AdmissionController, error::ConnectError, get_history::GetHistoryUseCase};

pub struct ConnectSessionUseCase {
    admission: Arc<AdmissionController>,
    history: Arc<GetHistoryUseCase>,
    /// Active になったときに再送する履歴の件数
    history_replay: usize,
}

impl ConnectSessionUseCase {
    pub fn new(
        admission: Arc<AdmissionController>,
        history: Arc<GetHistoryUseCase>,
        history_replay: usize,
    ) -> Self {
        Self {
            admission,
            history,
            history_replay,
        }
    }

    /// ストアに残っている直近の履歴を再送用の窓に読み込む
    ///
    /// 読み出しに失敗しても起動は続け、窓は空のまま始まる。
    pub async fn preload_history(&self) {
        match self.history.execute(self.history_replay).await {
            Ok(messages) => {
                tracing::info!("Loaded {} message(s) for history replay", messages.len());
                self.admission.seed_history(messages).await;
            }
            Err(e) => tracing::warn!("Failed to load history for replay: {}", e),
        }
    }

    /// 認証済みセッションを受け付ける
    pub async fn execute(
        &self,
        session_id: SessionId,
        username: Username,
        channel: PusherChannel,
    ) -> Result<AdmissionResult, ConnectError> {
        Ok(self.admission.admit(session_id, username, channel).await?)
    }
}
