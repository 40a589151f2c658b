//! Interactive Dengon client.
//!
//! Connects to the routing server as one user and sends direct messages typed
//! as `@recipient message`. Automatically reconnects on disconnection (max 5
//! attempts with 5 second interval).
//!
//! Run with:
//! ```not_rust
//! cargo run --bin dengon-client -- --user-id alice
//! cargo run --bin dengon-client -- -i bob -u ws://127.0.0.1:8080/ws
//! ```

use clap::Parser;

use dengon_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "dengon-client")]
#[command(about = "Direct-message client for the Dengon routing server", long_about = None)]
struct Args {
    /// User ID to connect as
    #[arg(short = 'i', long)]
    user_id: String,

    /// WebSocket server URL
    #[arg(short = 'u', long, default_value = "ws://127.0.0.1:8080/ws")]
    url: String,
}

#[tokio::main]
async fn main() {
    setup_logger(env!("CARGO_BIN_NAME"), "info");

    let args = Args::parse();

    if let Err(e) = dengon_client::run_client(args.url, args.user_id).await {
        tracing::error!("Client error: {}", e);
        std::process::exit(1);
    }
}
