//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::routing::get;
use tokio::net::TcpListener;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::{
    routing::Router,
    usecase::{
        ConnectUserUseCase, DisconnectUserUseCase, GetConversationHistoryUseCase,
        GetConversationUseCase, GetOnlineUsersUseCase, SendMessageUseCase,
    },
};

use super::{
    handler::{
        get_conversation, get_conversation_messages, get_online_users, health_check,
        websocket_handler,
    },
    signal::shutdown_signal,
    state::AppState,
};

/// WebSocket message routing server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(router);
/// server.run("127.0.0.1".to_string(), 8080).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    /// Create a new Server instance wired to `router`
    pub fn new(router: Arc<Router>) -> Self {
        let state = Arc::new(AppState {
            connect_user_usecase: Arc::new(ConnectUserUseCase::new(router.clone())),
            disconnect_user_usecase: Arc::new(DisconnectUserUseCase::new(router.clone())),
            send_message_usecase: Arc::new(SendMessageUseCase::new(router.clone())),
            get_conversation_usecase: Arc::new(GetConversationUseCase::new(router.clone())),
            get_conversation_history_usecase: Arc::new(GetConversationHistoryUseCase::new(
                router.clone(),
            )),
            get_online_users_usecase: Arc::new(GetOnlineUsersUseCase::new(
                router.registry().clone(),
            )),
            idle_timeout: router.config().idle_timeout,
        });
        Self { state }
    }

    /// Build the axum application
    pub fn build_app(&self) -> axum::Router {
        axum::Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .route("/api/users/online", get(get_online_users))
            .route("/api/conversations", get(get_conversation))
            .route(
                "/api/conversations/{conversation_id}/messages",
                get(get_conversation_messages),
            )
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                    .on_response(DefaultOnResponse::new().level(Level::INFO)),
            )
            .with_state(self.state.clone())
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.build_app();
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
    }

    /// Run the server
    ///
    /// # Arguments
    ///
    /// * `host` - The host address to bind to (e.g., "127.0.0.1")
    /// * `port` - The port number to bind to (e.g., 8080)
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self, host: String, port: u16) -> Result<(), Box<dyn std::error::Error>> {
        // Bind the server to the host and port
        let bind_addr = format!("{}:{}", host, port);
        let listener = TcpListener::bind(&bind_addr).await?;

        tracing::info!("Dengon server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws?user_id=<your id>", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
