//! Frame formatting for terminal display.

use luconnect_shared::protocol::{HistoryEntry, ServerFrame};
use luconnect_shared::time::timestamp_to_rfc3339;

const RULE: &str = "------------------------------------------------------------";

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format any frame received after authentication.
    ///
    /// Returns `None` for frames that print nothing (`notify` only rings the bell).
    pub fn format_frame(frame: &ServerFrame) -> Option<String> {
        let text = match frame {
            ServerFrame::QueuePosition {
                position,
                estimated_wait_secs,
            } => Self::format_queue_position(*position, *estimated_wait_secs),
            ServerFrame::Admitted { username } => Self::format_admitted(username),
            ServerFrame::Message {
                from,
                body,
                sent_at,
                delivered_at,
                ..
            } => Self::format_chat_message(from, body, *sent_at, *delivered_at),
            ServerFrame::Notify { .. } => return None,
            ServerFrame::Ack {
                sent_at,
                delivered_to,
            } => Self::format_ack(*sent_at, *delivered_to),
            ServerFrame::Warning { message, .. } => format!("\n! not saved: {}\n", message),
            ServerFrame::Error { code, message } => format!("\n! {} ({})\n", message, code),
            ServerFrame::ParticipantJoined { username, at } => {
                format!("\n+ {} joined at {}\n", username, timestamp_to_rfc3339(*at))
            }
            ServerFrame::ParticipantLeft { username, at } => {
                format!("\n- {} left at {}\n", username, timestamp_to_rfc3339(*at))
            }
            ServerFrame::History { messages } => Self::format_history(messages),
            ServerFrame::ServerShutdown => "\nServer is shutting down. Bye.\n".to_string(),
            ServerFrame::AuthStart { .. } | ServerFrame::AuthOk { .. } => return None,
            ServerFrame::AuthFailed {
                reason,
                remaining_attempts,
            } => Self::format_auth_failed(reason, *remaining_attempts),
        };
        Some(text)
    }

    pub fn format_queue_position(position: usize, estimated_wait_secs: u64) -> String {
        format!(
            "\nServer is full. You are number {} in the queue (about {} to wait).\n",
            position,
            format_wait(estimated_wait_secs)
        )
    }

    pub fn format_admitted(username: &str) -> String {
        format!(
            "\nWelcome, {}! Type a message and press Enter. Commands: /mute, /unmute, /exit\n",
            username
        )
    }

    /// Format a chat message with its sent and delivered timestamps
    pub fn format_chat_message(from: &str, body: &str, sent_at: i64, delivered_at: i64) -> String {
        format!(
            "\n\n{RULE}\n\
             @{}: {}\n\
             sent at {} / delivered at {}\n\
             {RULE}\n",
            from,
            body,
            timestamp_to_rfc3339(sent_at),
            timestamp_to_rfc3339(delivered_at)
        )
    }

    pub fn format_ack(sent_at: i64, delivered_to: usize) -> String {
        format!(
            "sent at {} to {} participant(s)\n",
            timestamp_to_rfc3339(sent_at),
            delivered_to
        )
    }

    pub fn format_history(messages: &[HistoryEntry]) -> String {
        let mut output = format!("\n{RULE}\nRecent messages:\n");
        for entry in messages {
            output.push_str(&format!(
                "[{}] @{}: {}\n",
                timestamp_to_rfc3339(entry.sent_at),
                entry.from,
                entry.body
            ));
        }
        output.push_str(RULE);
        output.push('\n');
        output
    }

    pub fn format_auth_failed(reason: &str, remaining_attempts: u32) -> String {
        format!(
            "Authentication failed ({}). {} attempt(s) left.\n",
            reason, remaining_attempts
        )
    }
}

fn format_wait(secs: u64) -> String {
    match (secs / 60, secs % 60) {
        (0, s) => format!("{}s", s),
        (m, 0) => format!("{}m", m),
        (m, s) => format!("{}m {}s", m, s),
    }
}
