//! WebSocket connection handlers.

use std::sync::Arc;

use axum::{
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::stream::{SplitStream, StreamExt};
use serde::Deserialize;
use tokio::task::JoinHandle;

use crate::{
    domain::UserId,
    infrastructure::transport::WebSocketFrameSink,
    routing::ConnectionHandle,
    ui::state::AppState,
    usecase::{ConnectUserUseCase, SendMessageUseCase},
};

/// Query parameters for WebSocket connection
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    pub user_id: String,
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let user_id = match ConnectUserUseCase::validate(&query.user_id) {
        Ok(id) => id,
        Err(e) => {
            tracing::warn!("Rejecting connection for '{}': {}", query.user_id, e);
            return Err(StatusCode::BAD_REQUEST);
        }
    };

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)))
}

/// Spawns the reader of one connection.
///
/// Every text frame goes through [`SendMessageUseCase`], which answers the
/// sender with an ack or an error frame. The reader stops on close, on a
/// socket error, or when no frame arrives within `idle_timeout`.
fn reader_loop(
    mut receiver: SplitStream<WebSocket>,
    handle: ConnectionHandle,
    send_message_usecase: Arc<SendMessageUseCase>,
    idle_timeout: std::time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let msg = match tokio::time::timeout(idle_timeout, receiver.next()).await {
                Err(_) => {
                    tracing::info!(
                        "Connection {} of '{}' idle for {:?}, closing",
                        handle.id(),
                        handle.user_id(),
                        idle_timeout
                    );
                    break;
                }
                Ok(None) => break,
                Ok(Some(Err(e))) => {
                    tracing::error!("WebSocket error on connection {}: {}", handle.id(), e);
                    break;
                }
                Ok(Some(Ok(msg))) => msg,
            };

            match msg {
                Message::Text(text) => {
                    tracing::debug!("Received text from '{}': {}", handle.user_id(), text);
                    // ack / error は UseCase が送信者のキューに投入する
                    match send_message_usecase.execute(&handle, text.as_str()).await {
                        Ok(receipt) => tracing::debug!(
                            "Message {} from '{}' handled: {:?}",
                            receipt.message_id,
                            handle.user_id(),
                            receipt.outcome
                        ),
                        Err(e) => tracing::debug!(
                            "Frame from '{}' on connection {} refused: {}",
                            handle.user_id(),
                            handle.id(),
                            e
                        ),
                    }
                }
                Message::Binary(_) => {
                    tracing::warn!(
                        "Ignoring binary frame from '{}' (text frames only)",
                        handle.user_id()
                    );
                }
                Message::Ping(_) | Message::Pong(_) => {
                    tracing::debug!("Received ping/pong");
                }
                Message::Close(_) => {
                    tracing::info!("Client '{}' requested close", handle.user_id());
                    break;
                }
            }
        }
    })
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, user_id: UserId) {
    let (sender, receiver) = socket.split();

    let attachment = state.connect_user_usecase.execute(user_id);
    let mut send_task = state
        .connect_user_usecase
        .start_delivery(&attachment, WebSocketFrameSink::new(sender))
        .await;
    let mut recv_task = reader_loop(
        receiver,
        attachment.handle.clone(),
        state.send_message_usecase.clone(),
        state.idle_timeout,
    );

    // どちらかのタスクが終わったらもう一方も止める
    let exit = tokio::select! {
        exit = &mut send_task => {
            recv_task.abort();
            exit.unwrap_or_default()
        }
        _ = &mut recv_task => {
            attachment.handle.cancel.cancel();
            send_task.await.unwrap_or_default()
        }
    };

    let undelivered = state
        .disconnect_user_usecase
        .execute(&attachment.token, exit);
    tracing::info!(
        "Client '{}' disconnected (connection {}, {} message(s) kept pending)",
        attachment.token.user_id(),
        attachment.token.connection_id(),
        undelivered
    );
}
