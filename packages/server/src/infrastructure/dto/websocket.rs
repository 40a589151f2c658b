//! WebSocket frame DTOs.
//!
//! Every frame is a JSON object carrying the schema version `"v"` and a
//! `"type"` tag:
//!
//! ```text
//! client -> server  {"v":1,"type":"chat","destination":"/app/chat","recipient_id":"bob","payload":"hi","client_ref":"c-1"}
//! server -> client  {"v":1,"type":"message","destination":"/user/bob/queue/messages","id":"...", ...}
//! server -> client  {"v":1,"type":"ack","message_id":"...","outcome":"queued", ...}
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::DeliveryStatus;

/// Current wire schema version
pub const WIRE_VERSION: u8 = 1;

/// Destination of inbound chat frames
pub const CHAT_DESTINATION: &str = "/app/chat";

/// Per-user destination prefix of outbound chat frames
pub const USER_DESTINATION_PREFIX: &str = "/user";

/// Destination a message for `user_id` is addressed to
pub fn user_queue_destination(user_id: &str) -> String {
    format!("{}/{}/queue/messages", USER_DESTINATION_PREFIX, user_id)
}

/// Versioned wrapper around a frame body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub v: u8,
    #[serde(flatten)]
    pub frame: T,
}

impl<T> Envelope<T> {
    pub fn new(frame: T) -> Self {
        Self {
            v: WIRE_VERSION,
            frame,
        }
    }
}

/// Only the version field, read before the body is interpreted
#[derive(Debug, Deserialize)]
pub struct FrameHeader {
    /// Wider than [`WIRE_VERSION`] so that any future version is reported as unsupported
    pub v: u64,
}

// ========================================
// client -> server
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    Chat(ChatFrame),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatFrame {
    pub destination: String,
    pub recipient_id: String,
    pub payload: String,
    /// Opaque client correlation id, echoed in the ack
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<String>,
}

// ========================================
// server -> client
// ========================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    Welcome(WelcomeFrame),
    Message(MessageFrame),
    Ack(AckFrame),
    Receipt(ReceiptFrame),
    Error(ErrorFrame),
}

/// First frame of every connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomeFrame {
    pub connection_id: String,
    pub user_id: String,
    pub connected_at: i64,
}

/// A chat message, field for field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageFrame {
    pub destination: String,
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub payload: String,
    pub server_timestamp: i64,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckOutcome {
    Queued,
    OfflinePending,
    Failed,
}

/// Result of one dispatch, sent to the sending connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AckFrame {
    pub message_id: String,
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<String>,
    pub outcome: AckOutcome,
    pub status: DeliveryStatus,
    pub server_timestamp: i64,
    /// Number of recipient connections that accepted the message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connections: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A message reached its recipient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReceiptFrame {
    pub message_id: String,
    pub conversation_id: String,
    pub recipient_id: String,
    pub status: DeliveryStatus,
    pub delivered_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    Malformed,
    UnsupportedVersion,
    UnknownDestination,
    Validation,
    NotFound,
    Timeout,
    ConnectionLost,
    Store,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorFrame {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_ref: Option<String>,
}
