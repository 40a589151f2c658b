//! Data Transfer Objects (DTOs) for the wire protocol.
//!
//! DTOs are organized by protocol:
//! - `websocket`: versioned WebSocket frame DTOs
//! - `http`: HTTP API response DTOs
//! - `conversion`: domain <-> DTO conversions
//! - `codec`: `WireCodec`, the JSON encoder/decoder for WebSocket frames

pub mod codec;
pub mod conversion;
pub mod http;
pub mod websocket;

pub use codec::{WireCodec, WireError};
