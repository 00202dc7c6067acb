//! Server configuration.

use std::{num::NonZeroUsize, path::PathBuf, time::Duration};

use thiserror::Error;

use crate::domain::AdmissionPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("capacity must be at least 1")]
    ZeroCapacity,

    #[error("outbox capacity must be at least 1")]
    ZeroOutboxCapacity,

    #[error("max auth attempts must be at least 1")]
    ZeroAuthAttempts,
}

/// Runtime settings of the chat server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Maximum number of Active sessions
    pub capacity: usize,
    pub average_session: Duration,
    /// Per-session outbox size (rounded up to a power of two)
    pub outbox_capacity: usize,
    pub max_auth_attempts: u32,
    pub auth_timeout: Duration,
    /// Number of stored messages replayed to a newly Active session
    pub history_replay: usize,
    /// JSON Lines history file; `None` keeps history in memory
    pub history_file: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 12345,
            capacity: AdmissionPolicy::DEFAULT_CAPACITY.get(),
            average_session: AdmissionPolicy::DEFAULT_AVERAGE_SESSION,
            outbox_capacity: 64,
            max_auth_attempts: 3,
            auth_timeout: Duration::from_secs(60),
            history_replay: 10,
            history_file: None,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        if self.outbox_capacity == 0 {
            return Err(ConfigError::ZeroOutboxCapacity);
        }
        if self.max_auth_attempts == 0 {
            return Err(ConfigError::ZeroAuthAttempts);
        }
        Ok(())
    }

    pub fn admission_policy(&self) -> Result<AdmissionPolicy, ConfigError> {
        let capacity = NonZeroUsize::new(self.capacity).ok_or(ConfigError::ZeroCapacity)?;
        Ok(AdmissionPolicy::new(capacity, self.average_session))
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
