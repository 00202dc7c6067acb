//! 受付制御（Admission）の状態
//!
//! ActiveSet と待機キューを 1 つの所有オブジェクトにまとめ、全ての状態遷移をここに集約します。
//! このオブジェクト自体は同期を持たず、UseCase 層が単一のロックの内側からだけ操作します。
//!
//! ## 不変条件
//!
//! - Active なセッション数は常に `capacity` 以下
//! - セッションが Active になるのは、空きがあり待機キューが空のときの即時受付か、
//!   キュー先頭からの取り出しのどちらかだけ（FIFO、追い越しなし）
//! - 待機中セッションの位置は常に 1 から連番で、キュー内の順序と一致する
//! - `close_all` の後は受付も昇格も起きない

use std::{
    collections::{HashMap, VecDeque},
    num::NonZeroUsize,
    time::Duration,
};

use super::{
    entity::{Session, SessionState},
    error::AdmissionError,
    value_object::{SessionId, Timestamp, Username},
};

/// 受付ポリシー（同時 Active 数と推定待ち時間の係数）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdmissionPolicy {
    capacity: NonZeroUsize,
    average_session: Duration,
}

impl AdmissionPolicy {
    pub const DEFAULT_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(2);
    pub const DEFAULT_AVERAGE_SESSION: Duration = Duration::from_secs(120);

    pub fn new(capacity: NonZeroUsize, average_session: Duration) -> Self {
        Self {
            capacity,
            average_session,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity.get()
    }

    pub fn average_session(&self) -> Duration {
        self.average_session
    }

    /// 推定待ち時間 = 位置 × 平均セッション時間
    pub fn estimated_wait(&self, position: usize) -> Duration {
        let factor = u32::try_from(position).unwrap_or(u32::MAX);
        self.average_session.saturating_mul(factor)
    }
}

impl Default for AdmissionPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY, Self::DEFAULT_AVERAGE_SESSION)
    }
}

/// 待機キューのエントリ（enqueue 時刻順）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEntry {
    pub session_id: SessionId,
    pub enqueued_at: Timestamp,
}

/// `admit` の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdmissionResult {
    Active,
    Waiting {
        position: usize,
        estimated_wait: Duration,
    },
}

/// メッセージ配送先
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub session_id: SessionId,
    pub username: Username,
    pub muted: bool,
}

/// `release` の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// 終了したセッション（状態は Closed）
    pub closed: Session,
    /// 終了前に Active だったか
    pub was_active: bool,
    /// 空いた枠に昇格したセッション
    pub promoted: Option<Session>,
    /// 位置が変わった待機セッションと新しい位置
    pub repositioned: Vec<(SessionId, usize)>,
}

/// ActiveSet + 待機キュー
#[derive(Debug, Clone)]
pub struct AdmissionState {
    policy: AdmissionPolicy,
    sessions: HashMap<SessionId, Session>,
    /// 受付順
    active: Vec<SessionId>,
    waiting: VecDeque<QueueEntry>,
    /// サーバー停止中
    closing: bool,
}

impl AdmissionState {
    pub fn new(policy: AdmissionPolicy) -> Self {
        Self {
            policy,
            sessions: HashMap::new(),
            active: Vec::new(),
            waiting: VecDeque::new(),
            closing: false,
        }
    }

    pub fn policy(&self) -> &AdmissionPolicy {
        &self.policy
    }

    /// 認証済みセッションを受け付ける
    ///
    /// 空きがあり待機者がいなければ即 Active、そうでなければキュー末尾に並べる。
    /// 同じユーザー名の生存セッションが既にあれば拒否する。
    pub fn admit(
        &mut self,
        session_id: SessionId,
        username: Username,
        now: Timestamp,
    ) -> Result<AdmissionResult, AdmissionError> {
        if self.closing {
            return Err(AdmissionError::ShuttingDown);
        }
        if self.contains_username(&username) {
            return Err(AdmissionError::AlreadyConnected(username));
        }

        let mut session = Session::new(session_id, username, now);
        let result = if self.active.len() < self.policy.capacity() && self.waiting.is_empty() {
            session.state = SessionState::Active;
            self.active.push(session_id);
            AdmissionResult::Active
        } else {
            self.waiting.push_back(QueueEntry {
                session_id,
                enqueued_at: now,
            });
            let position = self.waiting.len();
            session.state = SessionState::Waiting { position };
            AdmissionResult::Waiting {
                position,
                estimated_wait: self.policy.estimated_wait(position),
            }
        };

        self.sessions.insert(session_id, session);
        Ok(result)
    }

    /// セッションを終了させる
    ///
    /// Active だった場合は同じ操作の中でキュー先頭を昇格させ、残りの待機者の位置を詰める。
    /// 未知のセッションなら `None`（二重の release は無視される）。
    pub fn release(&mut self, session_id: &SessionId) -> Option<Release> {
        let mut closed = self.sessions.remove(session_id)?;
        let was_active = closed.is_active();
        closed.state = SessionState::Closed;

        let promoted = if was_active {
            self.active.retain(|id| id != session_id);
            self.promote_head()
        } else {
            self.waiting.retain(|entry| &entry.session_id != session_id);
            None
        };
        let repositioned = self.renumber_waiting();

        Some(Release {
            closed,
            was_active,
            promoted,
            repositioned,
        })
    }

    fn promote_head(&mut self) -> Option<Session> {
        if self.closing || self.active.len() >= self.policy.capacity() {
            return None;
        }
        while let Some(entry) = self.waiting.pop_front() {
            if let Some(session) = self.sessions.get_mut(&entry.session_id) {
                session.state = SessionState::Active;
                self.active.push(entry.session_id);
                return Some(session.clone());
            }
        }
        None
    }

    /// 全てのセッションを昇格なしで終了させる（サーバー停止）
    ///
    /// 返り値は Active → 待機の順。以降の `admit` は `ShuttingDown` になる。
    pub fn close_all(&mut self) -> Vec<Session> {
        self.closing = true;
        let ids = self.session_ids();
        self.active.clear();
        self.waiting.clear();
        ids.into_iter()
            .filter_map(|id| self.sessions.remove(&id))
            .map(|mut session| {
                session.state = SessionState::Closed;
                session
            })
            .collect()
    }

    pub fn is_closing(&self) -> bool {
        self.closing
    }

    fn renumber_waiting(&mut self) -> Vec<(SessionId, usize)> {
        let mut repositioned = Vec::new();
        for (index, entry) in self.waiting.iter().enumerate() {
            let position = index + 1;
            if let Some(session) = self.sessions.get_mut(&entry.session_id)
                && session.queue_position() != Some(position)
            {
                session.state = SessionState::Waiting { position };
                repositioned.push((entry.session_id, position));
            }
        }
        repositioned
    }

    /// ミュートフラグを設定。セッションが存在しなければ false
    pub fn set_muted(&mut self, session_id: &SessionId, muted: bool) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(session) => {
                session.muted = muted;
                true
            }
            None => false,
        }
    }

    pub fn session(&self, session_id: &SessionId) -> Option<&Session> {
        self.sessions.get(session_id)
    }

    pub fn is_active(&self, session_id: &SessionId) -> bool {
        self.sessions
            .get(session_id)
            .is_some_and(|session| session.is_active())
    }

    pub fn contains_username(&self, username: &Username) -> bool {
        self.sessions
            .values()
            .any(|session| &session.username == username)
    }

    /// Active なセッション（受付順）
    pub fn active_sessions(&self) -> Vec<&Session> {
        self.active
            .iter()
            .filter_map(|id| self.sessions.get(id))
            .collect()
    }

    /// 待機中のセッション（キュー順）
    pub fn waiting_sessions(&self) -> Vec<&Session> {
        self.waiting
            .iter()
            .filter_map(|entry| self.sessions.get(&entry.session_id))
            .collect()
    }

    pub fn queue_entries(&self) -> impl Iterator<Item = &QueueEntry> {
        self.waiting.iter()
    }

    /// 送信者以外の Active なセッション
    pub fn recipients_except(&self, sender: &SessionId) -> Vec<Recipient> {
        self.active_sessions()
            .into_iter()
            .filter(|session| &session.id != sender)
            .map(|session| Recipient {
                session_id: session.id,
                username: session.username.clone(),
                muted: session.muted,
            })
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting.len()
    }

    /// 生存中の全セッション ID（Active → 待機の順）
    pub fn session_ids(&self) -> Vec<SessionId> {
        self.active
            .iter()
            .copied()
            .chain(self.waiting.iter().map(|entry| entry.session_id))
            .collect()
    }
}
