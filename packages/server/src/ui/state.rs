//! Shared application state.

use std::{
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use tokio::sync::watch;

use crate::{
    domain::MessagePusher,
    usecase::{
        AuthenticateUseCase, ConnectSessionUseCase, DisconnectSessionUseCase,
        GetAdmissionSnapshotUseCase, GetHistoryUseCase, SendMessageUseCase, ToggleMuteUseCase,
    },
};

/// Per-connection settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub outbox_capacity: usize,
    pub auth_timeout: Duration,
}

/// 生存中の WebSocket 接続数
#[derive(Debug, Clone, Default)]
pub struct ConnectionCounter(Arc<AtomicUsize>);

impl ConnectionCounter {
    /// 接続を数え始める。返り値を drop すると数から外れる
    pub fn enter(&self) -> ConnectionGuard {
        self.0.fetch_add(1, Ordering::SeqCst);
        ConnectionGuard(self.0.clone())
    }

    pub fn live(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct ConnectionGuard(Arc<AtomicUsize>);

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct AppState {
    pub authenticate_usecase: Arc<AuthenticateUseCase>,
    pub connect_session_usecase: Arc<ConnectSessionUseCase>,
    pub disconnect_session_usecase: Arc<DisconnectSessionUseCase>,
    pub send_message_usecase: Arc<SendMessageUseCase>,
    pub toggle_mute_usecase: Arc<ToggleMuteUseCase>,
    pub get_admission_snapshot_usecase: Arc<GetAdmissionSnapshotUseCase>,
    pub get_history_usecase: Arc<GetHistoryUseCase>,
    /// MessagePusher（セッションへの直接の応答に使う）
    pub message_pusher: Arc<dyn MessagePusher>,
    pub settings: SessionSettings,
    /// `true` になったら全セッションを閉じる
    pub shutdown: watch::Receiver<bool>,
    pub connections: ConnectionCounter,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_guard_decrements_on_drop() {
        // テスト項目: ガードの drop で接続数が減る
        let counter = ConnectionCounter::default();
        let first = counter.enter();
        let second = counter.clone().enter();
        assert_eq!(counter.live(), 2);
        drop(first);
        assert_eq!(counter.live(), 1);
        drop(second);
        assert_eq!(counter.live(), 0);
    }
}
