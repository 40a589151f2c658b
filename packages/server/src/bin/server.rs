//! Dengon routing server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin dengon-server
//! cargo run --bin dengon-server -- --host 0.0.0.0 --port 3000 --backpressure drop-oldest
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use dengon_server::{
    config::{BackpressurePolicy, OfflinePolicy, RetryPolicy, RoutingConfig},
    infrastructure::{dto::WireCodec, store::InMemoryChatStore},
    routing::{ConnectionRegistry, ConversationIndex, Router},
    ui::Server,
};
use dengon_shared::{
    logger::setup_logger,
    time::{Clock, SystemClock},
};

#[derive(Parser, Debug)]
#[command(name = "dengon-server")]
#[command(about = "Presence-aware WebSocket message routing server", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value = "8080")]
    port: u16,

    /// Capacity of each connection's delivery queue
    #[arg(long, default_value = "256")]
    queue_capacity: usize,

    /// What producers experience when a delivery queue is full
    #[arg(long, value_enum, default_value_t = BackpressurePolicy::Block)]
    backpressure: BackpressurePolicy,

    /// What happens to messages for offline recipients
    #[arg(long, value_enum, default_value_t = OfflinePolicy::PersistAndRetry)]
    offline_policy: OfflinePolicy,

    /// Timeout of a single store operation (milliseconds)
    #[arg(long, default_value = "2000")]
    store_timeout_ms: u64,

    /// Timeout of a single frame send, and of a blocked enqueue (milliseconds)
    #[arg(long, default_value = "5000")]
    transport_timeout_ms: u64,

    /// Attempts per store operation, including the first
    #[arg(long, default_value = "3")]
    retry_attempts: u32,

    /// Close connections that send nothing for this long (seconds)
    #[arg(long, default_value = "300")]
    idle_timeout_secs: u64,
}

impl Args {
    fn routing_config(&self) -> RoutingConfig {
        RoutingConfig {
            queue_capacity: self.queue_capacity,
            backpressure: self.backpressure,
            offline_policy: self.offline_policy,
            store_timeout: Duration::from_millis(self.store_timeout_ms),
            transport_timeout: Duration::from_millis(self.transport_timeout_ms),
            retry: RetryPolicy {
                max_attempts: self.retry_attempts,
                ..RetryPolicy::default()
            },
            idle_timeout: Duration::from_secs(self.idle_timeout_secs),
            ..RoutingConfig::default()
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();
    let config = args.routing_config();
    tracing::info!("Routing config: {:?}", config);

    // Initialize dependencies in order:
    // 1. Store and clock
    // 2. Routing core (registry, conversation index, router)
    // 3. Server (use cases and handlers)
    let store = Arc::new(InMemoryChatStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let registry = Arc::new(ConnectionRegistry::new());
    let index = Arc::new(ConversationIndex::new(
        store.clone(),
        clock.clone(),
        config.store_timeout,
        config.retry,
    ));
    let router = Arc::new(Router::new(
        registry,
        index,
        store,
        Arc::new(WireCodec),
        clock,
        config,
    ));

    let server = Server::new(router);
    if let Err(e) = server.run(args.host, args.port).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
