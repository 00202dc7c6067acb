//! Domain logic for client-side operations.
//!
//! Pure functions with no I/O, so the authentication and reconnection
//! decisions can be tested without a server.

use luconnect_shared::protocol::ServerFrame;

use crate::error::ClientError;

/// What the client does next after a frame received while authenticating
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthStep {
    /// Credentials accepted under this username
    Authenticated(String),
    /// Credentials refused, ask again
    Retry { reason: String, remaining: u32 },
    /// The server ended the authentication phase
    Rejected(AuthEnd),
    /// Not an authentication reply
    Ignore,
}

/// Why authentication ended without success
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthEnd {
    Exhausted(String),
    AlreadyConnected(String),
    Shutdown,
}

impl From<AuthEnd> for ClientError {
    fn from(kind: AuthEnd) -> Self {
        match kind {
            AuthEnd::Exhausted(reason) => ClientError::AuthRejected(reason),
            AuthEnd::AlreadyConnected(name) => ClientError::AlreadyConnected(name),
            AuthEnd::Shutdown => ClientError::ServerShutdown,
        }
    }
}

/// Classify a server frame received during the authentication phase.
pub fn classify_auth_reply(frame: &ServerFrame, username: &str) -> AuthStep {
    match frame {
        ServerFrame::AuthOk { username } => AuthStep::Authenticated(username.clone()),
        ServerFrame::AuthFailed {
            reason,
            remaining_attempts: 0,
        } => AuthStep::Rejected(AuthEnd::Exhausted(reason.clone())),
        ServerFrame::AuthFailed {
            reason,
            remaining_attempts,
        } => AuthStep::Retry {
            reason: reason.clone(),
            remaining: *remaining_attempts,
        },
        ServerFrame::Error { code, .. } if code == "already-connected" => {
            AuthStep::Rejected(AuthEnd::AlreadyConnected(username.to_string()))
        }
        ServerFrame::Error { code, message } if code.starts_with("auth-") => {
            AuthStep::Rejected(AuthEnd::Exhausted(message.clone()))
        }
        ServerFrame::ServerShutdown => AuthStep::Rejected(AuthEnd::Shutdown),
        _ => AuthStep::Ignore,
    }
}

/// Whether the input line ends the session
pub fn is_exit_command(line: &str) -> bool {
    line.trim().eq_ignore_ascii_case("/exit")
}

/// Check if the client should exit immediately based on the error type.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    !matches!(error, ClientError::ConnectionError(_))
}

/// Check if the client should attempt to reconnect.
///
/// `current_attempt` is 0-indexed.
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}
