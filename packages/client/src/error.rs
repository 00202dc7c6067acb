//! Error types for the chat client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server refused the credentials and no attempts are left
    #[error("Authentication rejected: {0}")]
    AuthRejected(String),

    /// The username already owns a live session
    #[error("User '{0}' is already connected")]
    AlreadyConnected(String),

    /// The server is shutting down
    #[error("Server is shutting down")]
    ServerShutdown,

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Reading from the terminal failed or was interrupted
    #[error("Input closed: {0}")]
    InputClosed(String),
}
