//! Session Admission Controller
//!
//! ActiveSet と待機キューの全ての変更（受付・離脱・昇格・位置の繰り上げ）を 1 つのロックの内側で行います。
//!
//! ## 設計ノート
//!
//! - ロックの内側で行うのは outbox への push だけで、ネットワーク I/O やストアの呼び出しは行わない
//!   （outbox への push は容量付きチャンネルへの送信で、ブロックしない）
//! - 同じロックの内側で通知まで済ませるため、待機者に届く位置の更新は常に状態の変更順になる
//! - 通知先の outbox が閉じていた場合、そのセッションは同じ操作の中でキューから取り除く
//! - 直近のメッセージ窓も同じロックで守る。Router は配送先の確定と同時に窓へ記録し、
//!   Active になったセッションには `admitted` と同じ操作の中で窓の内容を `history` として積む。
//!   そのため履歴は必ずライブ配送より先に届き、同じメッセージが両方に含まれることはない

use std::{sync::Arc, time::Duration};

use luconnect_shared::time::Clock;
use tokio::sync::Mutex;

use crate::domain::{
    AdmissionError, AdmissionPolicy, AdmissionResult, AdmissionState, ChatMessage,
    MessagePushError, MessagePusher, PusherChannel, RecentMessages, Recipient, ServerEvent,
    Session, SessionId, Timestamp, Username,
};

use super::error::RouteError;

/// 待機中セッションのスナップショット
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingSnapshot {
    pub session: Session,
    pub enqueued_at: Timestamp,
    pub estimated_wait: Duration,
}

/// ActiveSet と待機キューのスナップショット（読み取り専用）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdmissionSnapshot {
    pub capacity: usize,
    /// 受付順
    pub active: Vec<Session>,
    /// キュー順
    pub waiting: Vec<WaitingSnapshot>,
}

/// `release` で起きたことのまとめ
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseSummary {
    /// 終了したセッション。要求されたセッションの後に、outbox が閉じていて巻き添えで取り除かれたセッションが続く
    pub closed: Vec<Session>,
    /// Active に昇格したセッション
    pub promoted: Vec<Session>,
}

/// ロックで守られる状態
struct Shared {
    state: AdmissionState,
    recent: RecentMessages,
}

/// 受付制御
pub struct AdmissionController {
    shared: Mutex<Shared>,
    message_pusher: Arc<dyn MessagePusher>,
    clock: Arc<dyn Clock>,
}

impl AdmissionController {
    pub fn new(
        policy: AdmissionPolicy,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shared: Mutex::new(Shared {
                state: AdmissionState::new(policy),
                recent: RecentMessages::new(0),
            }),
            message_pusher,
            clock,
        }
    }

    /// Active になったセッションに再送する直近メッセージの件数（既定は 0）
    pub fn with_history_replay(mut self, limit: usize) -> Self {
        self.shared.get_mut().recent = RecentMessages::new(limit);
        self
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    /// ストアから読んだ過去のメッセージで直近の窓を補う（起動時）
    pub async fn seed_history(&self, older: Vec<ChatMessage>) {
        self.shared.lock().await.recent.seed(older);
    }

    /// 認証済みセッションを受け付ける
    ///
    /// 空きがあれば Active にして `admitted`（と直近の `history`）を、なければキュー末尾に並べて
    /// `queue-position` をセッションの outbox に積む。
    pub async fn admit(
        &self,
        session_id: SessionId,
        username: Username,
        channel: PusherChannel,
    ) -> Result<AdmissionResult, AdmissionError> {
        let now = self.now();
        let mut guard = self.shared.lock().await;
        let shared = &mut *guard;

        let result = shared.state.admit(session_id, username.clone(), now)?;
        self.message_pusher
            .register_client(session_id, channel)
            .await;

        match result {
            AdmissionResult::Active => {
                tracing::info!("Session '{}' ({}) admitted immediately", session_id, username);
                if let Some(session) = shared.state.session(&session_id).cloned()
                    && let Err(e) = self.announce_admission(shared, &session, now).await
                {
                    tracing::warn!("Failed to announce admission of '{}': {}", username, e);
                }
            }
            AdmissionResult::Waiting {
                position,
                estimated_wait,
            } => {
                tracing::info!(
                    "Session '{}' ({}) queued at position {}",
                    session_id,
                    username,
                    position
                );
                let event = ServerEvent::QueuePosition {
                    position,
                    estimated_wait,
                };
                if let Err(e) = self.message_pusher.push_to(&session_id, event).await {
                    tracing::warn!("Failed to push queue position to '{}': {}", username, e);
                }
            }
        }

        Ok(result)
    }

    /// セッションを終了させ、空いた枠をキュー先頭に渡す
    ///
    /// 未知のセッション（既に release 済み）なら `None`。
    pub async fn release(&self, session_id: &SessionId) -> Option<ReleaseSummary> {
        let now = self.now();
        let mut guard = self.shared.lock().await;
        let summary = self.release_locked(&mut guard, *session_id, now).await;
        if summary.closed.is_empty() {
            None
        } else {
            Some(summary)
        }
    }

    async fn release_locked(
        &self,
        shared: &mut Shared,
        first: SessionId,
        now: Timestamp,
    ) -> ReleaseSummary {
        let mut summary = ReleaseSummary::default();
        let mut pending = vec![first];

        while let Some(session_id) = pending.pop() {
            let Some(release) = shared.state.release(&session_id) else {
                continue;
            };
            self.message_pusher.unregister_client(&session_id).await;
            tracing::info!(
                "Session '{}' ({}) closed (was active: {})",
                session_id,
                release.closed.username,
                release.was_active
            );

            if release.was_active {
                let promoted_id = release.promoted.as_ref().map(|s| s.id);
                let remaining: Vec<SessionId> = shared
                    .state
                    .active_sessions()
                    .iter()
                    .map(|s| s.id)
                    .filter(|id| Some(*id) != promoted_id)
                    .collect();
                let event = ServerEvent::ParticipantLeft {
                    username: release.closed.username.clone(),
                    at: now,
                };
                self.message_pusher.broadcast(&remaining, event).await;
            }

            if let Some(promoted) = &release.promoted {
                match self.announce_admission(shared, promoted, now).await {
                    Ok(()) => {
                        tracing::info!(
                            "Session '{}' ({}) promoted from queue",
                            promoted.id,
                            promoted.username
                        );
                        summary.promoted.push(promoted.clone());
                    }
                    Err(e) => {
                        tracing::warn!(
                            "Promoted session '{}' is unreachable, dropping it: {}",
                            promoted.username,
                            e
                        );
                        pending.push(promoted.id);
                    }
                }
            }

            for (waiting_id, position) in &release.repositioned {
                let event = ServerEvent::QueuePosition {
                    position: *position,
                    estimated_wait: shared.state.policy().estimated_wait(*position),
                };
                if let Err(e) = self.message_pusher.push_to(waiting_id, event).await {
                    tracing::warn!(
                        "Waiting session '{}' is unreachable, dropping it from the queue: {}",
                        waiting_id,
                        e
                    );
                    pending.push(*waiting_id);
                }
            }

            summary.closed.push(release.closed);
        }

        summary
    }

    /// `admitted` と直近の `history` を本人に、`participant-joined` を他の Active セッションに送る
    async fn announce_admission(
        &self,
        shared: &Shared,
        session: &Session,
        now: Timestamp,
    ) -> Result<(), MessagePushError> {
        self.message_pusher
            .push_to(
                &session.id,
                ServerEvent::Admitted {
                    username: session.username.clone(),
                },
            )
            .await?;
        if !shared.recent.is_empty() {
            self.message_pusher
                .push_to(&session.id, ServerEvent::History(shared.recent.to_vec()))
                .await?;
        }

        let others: Vec<SessionId> = shared
            .state
            .active_sessions()
            .iter()
            .filter(|s| s.id != session.id)
            .map(|s| s.id)
            .collect();
        let event = ServerEvent::ParticipantJoined {
            username: session.username.clone(),
            at: now,
        };
        self.message_pusher.broadcast(&others, event).await;
        Ok(())
    }

    /// 全セッションを昇格なしで終了させ、それぞれに `server-shutdown` を積む
    ///
    /// outbox の登録も外すため、各 writer は残りを送り切って止まる。以降の受付は拒否される。
    pub async fn shutdown(&self) -> Vec<Session> {
        let mut guard = self.shared.lock().await;
        let closed = guard.state.close_all();
        for session in &closed {
            if let Err(e) = self
                .message_pusher
                .push_to(&session.id, ServerEvent::Shutdown)
                .await
            {
                tracing::debug!("Failed to notify '{}' of shutdown: {}", session.username, e);
            }
            self.message_pusher.unregister_client(&session.id).await;
        }
        tracing::info!("Closed {} session(s) for shutdown", closed.len());
        closed
    }

    /// ミュートフラグを設定。セッションが存在しなければ false
    pub async fn set_muted(&self, session_id: &SessionId, muted: bool) -> bool {
        self.shared.lock().await.state.set_muted(session_id, muted)
    }

    /// 送信者が Active であればそのユーザー名を返す
    pub async fn active_username(&self, session_id: &SessionId) -> Result<Username, RouteError> {
        let guard = self.shared.lock().await;
        match guard.state.session(session_id) {
            Some(session) if session.is_active() => Ok(session.username.clone()),
            Some(_) => Err(RouteError::NotActive),
            None => Err(RouteError::SessionClosed),
        }
    }

    /// メッセージを直近の窓に記録し、送信者以外の Active セッションを配送先として返す
    ///
    /// 送信者が Active でなければ記録せずにエラー。
    pub async fn commit_message(
        &self,
        sender: &SessionId,
        message: &ChatMessage,
    ) -> Result<Vec<Recipient>, RouteError> {
        let mut guard = self.shared.lock().await;
        let shared = &mut *guard;
        match shared.state.session(sender) {
            Some(session) if session.is_active() => {}
            Some(_) => return Err(RouteError::NotActive),
            None => return Err(RouteError::SessionClosed),
        }
        shared.recent.push(message.clone());
        Ok(shared.state.recipients_except(sender))
    }

    pub async fn is_active(&self, session_id: &SessionId) -> bool {
        self.shared.lock().await.state.is_active(session_id)
    }

    pub async fn contains_username(&self, username: &Username) -> bool {
        self.shared.lock().await.state.contains_username(username)
    }

    pub async fn snapshot(&self) -> AdmissionSnapshot {
        let guard = self.shared.lock().await;
        let state = &guard.state;
        let policy = *state.policy();
        let waiting = state
            .queue_entries()
            .filter_map(|entry| {
                let session = state.session(&entry.session_id)?;
                let position = session.queue_position()?;
                Some(WaitingSnapshot {
                    session: session.clone(),
                    enqueued_at: entry.enqueued_at,
                    estimated_wait: policy.estimated_wait(position),
                })
            })
            .collect();

        AdmissionSnapshot {
            capacity: policy.capacity(),
            active: state.active_sessions().into_iter().cloned().collect(),
            waiting,
        }
    }
}
