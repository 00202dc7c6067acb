//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use super::websocket::HistoryEntry;

/// Active session in the admission snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActiveSessionDto {
    pub username: String,
    /// RFC 3339
    pub connected_at: String,
    pub muted: bool,
}

/// Waiting session in the admission snapshot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WaitingSessionDto {
    pub username: String,
    pub position: usize,
    pub estimated_wait_secs: u64,
    /// RFC 3339
    pub enqueued_at: String,
}

/// `GET /api/sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionSnapshotDto {
    pub capacity: usize,
    pub active: Vec<ActiveSessionDto>,
    pub waiting: Vec<WaitingSessionDto>,
}

/// `GET /api/history`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryDto {
    pub messages: Vec<HistoryEntry>,
}
