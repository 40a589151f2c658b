//! HTTP API response DTOs.

use serde::{Deserialize, Serialize};

use crate::domain::DeliveryStatus;

/// Conversation detail
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationDto {
    pub id: String,
    /// Sorted participant pair
    pub participants: [String; 2],
    pub initiator: String,
    /// RFC 3339 (UTC)
    pub created_at: String,
    /// RFC 3339 (UTC)
    pub last_activity_at: String,
}

/// One stored message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageDto {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub payload: String,
    pub server_timestamp: i64,
    /// RFC 3339 (UTC)
    pub sent_at: String,
    pub status: DeliveryStatus,
}

/// Conversation history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationHistoryDto {
    pub conversation_id: String,
    pub messages: Vec<MessageDto>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineUserDto {
    pub user_id: String,
    pub connections: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineUsersDto {
    pub users: Vec<OnlineUserDto>,
    /// Total live connections
    pub connections: usize,
}
