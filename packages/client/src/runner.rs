//! Client execution logic with reconnection support.

use std::time::Duration;

use super::{
    domain::{should_attempt_reconnect, should_exit_immediately},
    error::ClientError,
    session::run_client_session,
    ui::LineInput,
};

const MAX_RECONNECT_ATTEMPTS: u32 = 5;
const RECONNECT_INTERVAL_SECS: u64 = 5;

/// Credentials given on the command line; missing values are prompted for.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
    /// Register a new account instead of logging in
    pub register: bool,
}

/// Run the chat client with reconnection logic
pub async fn run_client(url: String, mut credentials: Credentials) -> Result<(), ClientError> {
    let mut input = LineInput::spawn();
    let mut reconnect_count = 0;

    loop {
        tracing::info!(
            "Attempting to connect to {} (attempt {}/{})",
            url,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );

        let error = match run_client_session(&url, &mut credentials, &mut input).await {
            Ok(()) => {
                tracing::info!("Client session ended normally");
                return Ok(());
            }
            Err(e) => e,
        };

        if should_exit_immediately(&error) {
            return Err(error);
        }

        tracing::warn!("Connection lost: {}", error);
        reconnect_count += 1;
        if !should_attempt_reconnect(&error, reconnect_count, MAX_RECONNECT_ATTEMPTS) {
            tracing::error!(
                "Failed to reconnect after {} attempts. Exiting.",
                MAX_RECONNECT_ATTEMPTS
            );
            return Err(error);
        }

        tracing::info!(
            "Reconnecting in {} seconds... (attempt {}/{})",
            RECONNECT_INTERVAL_SECS,
            reconnect_count + 1,
            MAX_RECONNECT_ATTEMPTS
        );
        tokio::time::sleep(Duration::from_secs(RECONNECT_INTERVAL_SECS)).await;
    }
}
