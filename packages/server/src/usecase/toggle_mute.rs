//! UseCase: `/mute` と `/unmute`
//!
//! セッション自身のミュートフラグだけを変更し、フレームは何も送りません。

use std::sync::Arc;

use crate::domain::SessionId;

use super::admission::AdmissionController;

pub struct ToggleMuteUseCase {
    admission: Arc<AdmissionController>,
}

impl ToggleMuteUseCase {
    pub fn new(admission: Arc<AdmissionController>) -> Self {
        Self { admission }
    }

    /// ミュートフラグを設定。セッションが終了済みなら false
    pub async fn execute(&self, session_id: &SessionId, muted: bool) -> bool {
        let applied = self.admission.set_muted(session_id, muted).await;
        if applied {
            tracing::debug!("Session '{}' muted: {}", session_id, muted);
        }
        applied
    }
}
