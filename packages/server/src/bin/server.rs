//! LU-Connect chat server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin luconnect-server
//! cargo run --bin luconnect-server -- --host 0.0.0.0 --port 12345 --capacity 3
//! ```

use std::{path::PathBuf, sync::Arc, time::Duration};

use clap::Parser;
use luconnect_server::{
    config::ServerConfig,
    domain::MessageStore,
    infrastructure::{
        auth::InMemoryAuthGateway,
        store::{InMemoryMessageStore, JsonLinesMessageStore},
    },
    ui::Server,
};
use luconnect_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "luconnect-server")]
#[command(about = "LU-Connect chat server with a bounded active set and waiting queue", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "LUCONNECT_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "LUCONNECT_PORT", default_value = "12345")]
    port: u16,

    /// Maximum number of concurrently active sessions
    #[arg(long, env = "LUCONNECT_CAPACITY", default_value = "3")]
    capacity: usize,

    /// Average session length used for the estimated wait
    #[arg(long, env = "LUCONNECT_AVERAGE_SESSION_SECS", default_value = "120")]
    average_session_secs: u64,

    /// Events buffered per session before the oldest are dropped
    #[arg(long, env = "LUCONNECT_OUTBOX_CAPACITY", default_value = "64")]
    outbox_capacity: usize,

    /// Failed login / register attempts allowed per connection
    #[arg(long, env = "LUCONNECT_MAX_AUTH_ATTEMPTS", default_value = "3")]
    max_auth_attempts: u32,

    /// Seconds a connection may spend authenticating
    #[arg(long, env = "LUCONNECT_AUTH_TIMEOUT_SECS", default_value = "60")]
    auth_timeout_secs: u64,

    /// Stored messages replayed to a session when it becomes active
    #[arg(long, env = "LUCONNECT_HISTORY_REPLAY", default_value = "10")]
    history_replay: usize,

    /// JSON Lines file for message history (in-memory when omitted)
    #[arg(long, env = "LUCONNECT_HISTORY_FILE")]
    history_file: Option<PathBuf>,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            capacity: args.capacity,
            average_session: Duration::from_secs(args.average_session_secs),
            outbox_capacity: args.outbox_capacity,
            max_auth_attempts: args.max_auth_attempts,
            auth_timeout: Duration::from_secs(args.auth_timeout_secs),
            history_replay: args.history_replay,
            history_file: args.history_file,
        }
    }
}

async fn run(config: ServerConfig) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let message_store: Arc<dyn MessageStore> = match &config.history_file {
        Some(path) => {
            tracing::info!("Message history is stored in {}", path.display());
            Arc::new(JsonLinesMessageStore::new(path.clone()))
        }
        None => {
            tracing::info!("Message history is kept in memory");
            Arc::new(InMemoryMessageStore::new())
        }
    };
    let auth_gateway = Arc::new(InMemoryAuthGateway::new());

    let server = Server::from_config(&config, auth_gateway, message_store, Arc::new(SystemClock))?;
    server.run().await
}

#[tokio::main]
async fn main() {
    setup_logger(&[env!("CARGO_CRATE_NAME")], "info");

    let config = ServerConfig::from(Args::parse());
    tracing::info!(
        "Starting with capacity {}, outbox {}, {} auth attempt(s)",
        config.capacity,
        config.outbox_capacity,
        config.max_auth_attempts
    );

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
