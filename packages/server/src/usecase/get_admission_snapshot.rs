//! UseCase: 受付状態のスナップショット取得（HTTP API 用）

use std::sync::Arc;

use super::admission::{AdmissionController, AdmissionSnapshot};

pub struct GetAdmissionSnapshotUseCase {
    admission: Arc<AdmissionController>,
}

impl GetAdmissionSnapshotUseCase {
    pub fn new(admission: Arc<AdmissionController>) -> Self {
        Self { admission }
    }

    pub async fn execute(&self) -> AdmissionSnapshot {
        self.admission.snapshot().await
    }
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroUsize, time::Duration};

    use luconnect_shared::time::FixedClock;

    use super::*;
    use crate::{
        domain::{AdmissionPolicy, SessionId, Timestamp, Username},
        infrastructure::message_pusher::{OutboxMessagePusher, outbox_channel},
    };

    #[tokio::test]
    async fn test_snapshot_lists_active_and_waiting_in_order() {
        // テスト項目: Active は受付順、待機者はキュー順で、推定待ち時間は位置 × 平均セッション時間
        // given (前提条件):
        let admission = Arc::new(AdmissionController::new(
            AdmissionPolicy::new(NonZeroUsize::new(1).unwrap(), Duration::from_secs(30)),
            Arc::new(OutboxMessagePusher::new()),
            Arc::new(FixedClock::new(500)),
        ));
        let mut receivers = Vec::new();
        for name in ["alice", "bob", "charlie"] {
            let (tx, rx) = outbox_channel(8);
            receivers.push(rx);
            admission
                .admit(SessionId::generate(), Username::new(name.to_string()).unwrap(), tx)
                .await
                .unwrap();
        }
        let usecase = GetAdmissionSnapshotUseCase::new(admission);

        // when (操作):
        let snapshot = usecase.execute().await;

        // then (期待する結果):
        assert_eq!(snapshot.capacity, 1);
        assert_eq!(snapshot.active.len(), 1);
        assert_eq!(snapshot.active[0].username.as_str(), "alice");
        let waiting: Vec<(&str, Duration)> = snapshot
            .waiting
            .iter()
            .map(|w| (w.session.username.as_str(), w.estimated_wait))
            .collect();
        assert_eq!(
            waiting,
            vec![
                ("bob", Duration::from_secs(30)),
                ("charlie", Duration::from_secs(60)),
            ]
        );
        assert_eq!(snapshot.waiting[0].enqueued_at, Timestamp::new(500));
    }
}
