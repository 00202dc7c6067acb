//! LU-Connect terminal chat client.
//!
//! Signs in (or registers), then sends each typed line to the server.
//! `/mute` and `/unmute` toggle the notification bell, `/exit` leaves.
//! Reconnects on a lost connection (max 5 attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin luconnect-client -- --username alice
//! cargo run --bin luconnect-client -- --username bob --register
//! ```

use clap::Parser;
use luconnect_client::{Credentials, run_client};
use luconnect_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "luconnect-client")]
#[command(about = "Terminal client for the LU-Connect chat server", long_about = None)]
struct Args {
    /// WebSocket server URL
    #[arg(
        short = 'u',
        long,
        env = "LUCONNECT_URL",
        default_value = "ws://127.0.0.1:12345/ws"
    )]
    url: String,

    /// Username (prompted for when omitted)
    #[arg(short = 'n', long)]
    username: Option<String>,

    /// Register a new account instead of logging in
    #[arg(long)]
    register: bool,
}

#[tokio::main]
async fn main() {
    setup_logger(&["luconnect_client"], "warn");

    let args = Args::parse();
    let credentials = Credentials {
        username: args.username,
        password: None,
        register: args.register,
    };

    if let Err(e) = run_client(args.url, credentials).await {
        tracing::error!("Client error: {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}
