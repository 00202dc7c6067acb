//! UseCase: セッションの終了
//!
//! `/exit`・切断のどちらでも同じ処理を通ります。
//! サーバー停止時は `shutdown_all` で全セッションを昇格なしに一度に終了させます。

use std::sync::Arc;

use crate::domain::{Session, SessionId};

use super::admission::{AdmissionController, ReleaseSummary};

pub struct DisconnectSessionUseCase {
    admission: Arc<AdmissionController>,
}

impl DisconnectSessionUseCase {
    pub fn new(admission: Arc<AdmissionController>) -> Self {
        Self { admission }
    }

    /// セッションを終了させる（既に終了済みなら `None`）
    pub async fn execute(&self, session_id: &SessionId) -> Option<ReleaseSummary> {
        self.admission.release(session_id).await
    }

    /// 全セッションに `server-shutdown` を積んで終了させる
    pub async fn shutdown_all(&self) -> Vec<Session> {
        self.admission.shutdown().await
    }
}
