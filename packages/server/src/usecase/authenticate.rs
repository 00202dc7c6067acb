//! UseCase: 認証
//!
//! 1 回の認証試行（ログインまたは新規登録）を Auth Gateway に委譲します。
//! 試行回数の上限と認証フェーズのタイムアウトは接続ごとに UI 層が数えます。

use std::sync::Arc;

use crate::domain::{AuthGateway, Username};

use super::{admission::AdmissionController, error::AuthenticateError};

/// 認証の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthKind {
    Login,
    Register,
}

/// 認証要求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    pub kind: AuthKind,
    pub username: String,
    pub password: String,
}

/// 残りの試行回数
pub fn remaining_attempts(failed: u32, max_attempts: u32) -> u32 {
    max_attempts.saturating_sub(failed)
}

pub struct AuthenticateUseCase {
    gateway: Arc<dyn AuthGateway>,
    admission: Arc<AdmissionController>,
    max_attempts: u32,
}

impl AuthenticateUseCase {
    pub fn new(
        gateway: Arc<dyn AuthGateway>,
        admission: Arc<AdmissionController>,
        max_attempts: u32,
    ) -> Self {
        Self {
            gateway,
            admission,
            max_attempts,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// 認証を 1 回試行し、成功すれば認証済みのユーザー名を返す
    ///
    /// 資格情報が正しくても、同じユーザー名の生存セッションがあれば `AlreadyConnected`。
    pub async fn execute(&self, request: AuthRequest) -> Result<Username, AuthenticateError> {
        let username = Username::new(request.username)?;

        match request.kind {
            AuthKind::Login => self.gateway.login(&username, &request.password).await?,
            AuthKind::Register => self.gateway.register(&username, &request.password).await?,
        }

        if self.admission.contains_username(&username).await {
            tracing::warn!("User '{}' already has a live session", username);
            return Err(AuthenticateError::AlreadyConnected(username.into_string()));
        }

        tracing::info!("User '{}' authenticated ({:?})", username, request.kind);
        Ok(username)
    }
}
