//! WebSocket を使った FrameSink 実装
//!
//! ## 責務
//!
//! - 分割された WebSocket の送信側（`SplitSink`）を保持
//! - DeliveryWriter から渡されたフレームをテキストメッセージとして送信
//!
//! WebSocket の生成と受信側の処理は UI 層（`ui/handler/websocket.rs`）で行われます。

use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, stream::SplitSink};

use crate::domain::{FrameSink, TransportError};

/// 1 本の WebSocket 接続の送信口
pub struct WebSocketFrameSink {
    sender: SplitSink<WebSocket, Message>,
}

impl WebSocketFrameSink {
    pub fn new(sender: SplitSink<WebSocket, Message>) -> Self {
        Self { sender }
    }
}

#[async_trait]
impl FrameSink for WebSocketFrameSink {
    async fn send(&mut self, frame: String) -> Result<(), TransportError> {
        self.sender
            .send(Message::Text(frame.into()))
            .await
            .map_err(|e| TransportError::SendFailed(e.to_string()))
    }

    async fn close(&mut self) {
        if let Err(e) = self.sender.close().await {
            tracing::debug!("WebSocket close failed: {}", e);
        }
    }
}
