//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    infrastructure::dto::{
        http::{ActiveSessionDto, AdmissionSnapshotDto, HistoryDto, WaitingSessionDto},
        websocket::HistoryEntry,
    },
    ui::state::AppState,
};
use luconnect_shared::time::timestamp_to_rfc3339;

const DEFAULT_HISTORY_LIMIT: usize = 50;
const MAX_HISTORY_LIMIT: usize = 500;

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Current Active sessions and waiting queue
pub async fn get_sessions(State(state): State<Arc<AppState>>) -> Json<AdmissionSnapshotDto> {
    let snapshot = state.get_admission_snapshot_usecase.execute().await;

    // Domain Model から DTO への変換
    let active = snapshot
        .active
        .into_iter()
        .map(|session| ActiveSessionDto {
            username: session.username.into_string(),
            connected_at: timestamp_to_rfc3339(session.created_at.value()),
            muted: session.muted,
        })
        .collect();
    let waiting = snapshot
        .waiting
        .into_iter()
        .map(|waiting| WaitingSessionDto {
            position: waiting.session.queue_position().unwrap_or_default(),
            username: waiting.session.username.into_string(),
            estimated_wait_secs: waiting.estimated_wait.as_secs(),
            enqueued_at: timestamp_to_rfc3339(waiting.enqueued_at.value()),
        })
        .collect();

    Json(AdmissionSnapshotDto {
        capacity: snapshot.capacity,
        active,
        waiting,
    })
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// Most recent stored messages, oldest first
pub async fn get_history(
    State(state): State<Arc<AppState>>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryDto>, StatusCode> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_HISTORY_LIMIT)
        .min(MAX_HISTORY_LIMIT);

    match state.get_history_usecase.execute(limit).await {
        Ok(messages) => Ok(Json(HistoryDto {
            messages: messages.into_iter().map(HistoryEntry::from).collect(),
        })),
        Err(e) => {
            tracing::error!("Failed to read history: {}", e);
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}
