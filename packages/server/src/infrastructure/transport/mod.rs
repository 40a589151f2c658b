//! FrameSink implementations.
//!
//! - `websocket`: axum WebSocket を使った実装

pub mod websocket;

pub use websocket::WebSocketFrameSink;
