//! Infrastructure 層
//!
//! ドメイン層の trait（`ChatStore`, `FrameSink`, `FrameEncoder`）の具体的な実装を提供します。
//!
//! - `store`: インメモリの ChatStore
//! - `dto`: バージョンつきワイヤースキーマとコーデック
//! - `transport`: WebSocket を使った FrameSink

pub mod dto;
pub mod store;
pub mod transport;
