//! InMemory Auth Gateway 実装
//!
//! パスワードは SHA-256 の 16 進ダイジェストとして保持し、平文は保存しない。

use std::collections::HashMap;

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;

use crate::domain::{AuthError, AuthGateway, Username};

/// パスワードの一方向ハッシュ（SHA-256, 16 進表記）
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

/// インメモリ Auth Gateway 実装
pub struct InMemoryAuthGateway {
    /// ユーザー名 → パスワードハッシュ
    credentials: Mutex<HashMap<Username, String>>,
}

impl InMemoryAuthGateway {
    pub fn new() -> Self {
        Self {
            credentials: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryAuthGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AuthGateway for InMemoryAuthGateway {
    async fn register(&self, username: &Username, password: &str) -> Result<(), AuthError> {
        let mut credentials = self.credentials.lock().await;
        if credentials.contains_key(username) {
            return Err(AuthError::UsernameTaken(username.to_string()));
        }
        credentials.insert(username.clone(), hash_password(password));
        tracing::debug!("Registered user '{}'", username);
        Ok(())
    }

    async fn login(&self, username: &Username, password: &str) -> Result<(), AuthError> {
        let credentials = self.credentials.lock().await;
        match credentials.get(username) {
            Some(stored) if *stored == hash_password(password) => Ok(()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}
