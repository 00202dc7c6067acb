//! WebSocket wire protocol shared by the server and the client.
//!
//! Every frame is a JSON text frame tagged by `"type"` (kebab-case).

use serde::{Deserialize, Serialize};

/// Frames sent by a client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientFrame {
    Login { username: String, password: String },
    Register { username: String, password: String },
    /// One input line: chat text or `/mute`, `/unmute`, `/exit`
    Line { text: String },
}

impl ClientFrame {
    /// Parse an inbound text frame.
    ///
    /// Only a JSON object carrying a `"type"` tag is read as a frame; an unknown
    /// or malformed tagged frame yields `None`. Any other text is a raw input line.
    pub fn parse(text: &str) -> Option<Self> {
        match serde_json::from_str::<serde_json::Value>(text) {
            Ok(value) if value.get("type").is_some() => serde_json::from_value(value).ok(),
            _ => Some(ClientFrame::Line {
                text: text.to_string(),
            }),
        }
    }
}

/// A stored message replayed on admission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub from: String,
    pub body: String,
    pub sent_at: i64,
}

/// Frames sent by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerFrame {
    AuthStart {
        max_attempts: u32,
    },
    AuthOk {
        username: String,
    },
    AuthFailed {
        reason: String,
        remaining_attempts: u32,
    },
    QueuePosition {
        position: usize,
        estimated_wait_secs: u64,
    },
    Admitted {
        username: String,
    },
    Message {
        from: String,
        body: String,
        sent_at: i64,
        delivered_at: i64,
        audible: bool,
    },
    Notify {
        from: String,
        delivered_at: i64,
    },
    Ack {
        sent_at: i64,
        delivered_to: usize,
    },
    Warning {
        code: String,
        message: String,
        sent_at: i64,
    },
    Error {
        code: String,
        message: String,
    },
    ParticipantJoined {
        username: String,
        at: i64,
    },
    ParticipantLeft {
        username: String,
        at: i64,
    },
    History {
        messages: Vec<HistoryEntry>,
    },
    ServerShutdown,
}

impl ServerFrame {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
