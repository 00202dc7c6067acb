//! Conversion logic between domain events / entities and DTOs.

use crate::domain::{ChatMessage, ServerEvent};
use crate::infrastructure::dto::websocket as dto;

// ========================================
// Domain → DTO
// ========================================

impl From<ChatMessage> for dto::HistoryEntry {
    fn from(model: ChatMessage) -> Self {
        Self {
            from: model.from.into_string(),
            body: model.body.into_string(),
            sent_at: model.sent_at.value(),
        }
    }
}

impl From<ServerEvent> for dto::ServerFrame {
    fn from(event: ServerEvent) -> Self {
        match event {
            ServerEvent::QueuePosition {
                position,
                estimated_wait,
            } => Self::QueuePosition {
                position,
                estimated_wait_secs: estimated_wait.as_secs(),
            },
            ServerEvent::Admitted { username } => Self::Admitted {
                username: username.into_string(),
            },
            ServerEvent::Message(delivery) => Self::Message {
                from: delivery.message.from.into_string(),
                body: delivery.message.body.into_string(),
                sent_at: delivery.message.sent_at.value(),
                delivered_at: delivery.delivered_at.value(),
                audible: delivery.audible,
            },
            ServerEvent::Notify { from, delivered_at } => Self::Notify {
                from: from.into_string(),
                delivered_at: delivered_at.value(),
            },
            ServerEvent::Ack {
                sent_at,
                delivered_to,
            } => Self::Ack {
                sent_at: sent_at.value(),
                delivered_to,
            },
            ServerEvent::DeliveryUnconfirmed { sent_at, reason } => Self::Warning {
                code: "delivery-unconfirmed".to_string(),
                message: reason,
                sent_at: sent_at.value(),
            },
            ServerEvent::Rejected { code, message } => Self::Error {
                code: code.as_str().to_string(),
                message,
            },
            ServerEvent::ParticipantJoined { username, at } => Self::ParticipantJoined {
                username: username.into_string(),
                at: at.value(),
            },
            ServerEvent::ParticipantLeft { username, at } => Self::ParticipantLeft {
                username: username.into_string(),
                at: at.value(),
            },
            ServerEvent::History(messages) => Self::History {
                messages: messages.into_iter().map(Into::into).collect(),
            },
            ServerEvent::Shutdown => Self::ServerShutdown,
        }
    }
}
