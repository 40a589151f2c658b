//! Entities
//!
//! 会話（Conversation）、接続（Connection）、メッセージ（Message）を定義します。

use serde::{Deserialize, Serialize};

use super::{
    error::DomainError,
    value_object::{
        ConnectionId, ConversationId, ConversationKey, MessageId, Payload, Timestamp, UserId,
    },
};

/// 会話
///
/// 順序を持たない参加者の組 1 つにつき 1 件だけ存在する。
/// 作成後に変化するのは `last_activity_at` のみで、削除されることはない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub key: ConversationKey,
    /// 最初のメッセージの送信者（方向性のメタデータ）
    pub initiator: UserId,
    pub created_at: Timestamp,
    pub last_activity_at: Timestamp,
}

impl Conversation {
    /// Start a conversation between `initiator` and `other`
    pub fn start(initiator: UserId, other: UserId, now: Timestamp) -> Self {
        Self {
            id: ConversationId::generate(),
            key: ConversationKey::new(initiator.clone(), other),
            initiator,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Record activity; timestamps never move backwards
    pub fn touch(&mut self, at: Timestamp) {
        if at > self.last_activity_at {
            self.last_activity_at = at;
        }
    }

    /// Whether this conversation was started by `sender` towards `recipient`
    pub fn is_directed(&self, sender: &UserId, recipient: &UserId) -> bool {
        &self.initiator == sender && self.key.other(sender) == Some(recipient)
    }
}

/// 1 つのライブなクライアントセッション
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub id: ConnectionId,
    pub user_id: UserId,
    pub connected_at: Timestamp,
}

impl Connection {
    pub fn new(user_id: UserId, connected_at: Timestamp) -> Self {
        Self {
            id: ConnectionId::generate(),
            user_id,
            connected_at,
        }
    }
}

/// メッセージの配送状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
}

impl DeliveryStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, DeliveryStatus::Pending)
    }

    /// Only `Pending -> Delivered` and `Pending -> Failed` are allowed.
    pub fn can_transition_to(&self, to: DeliveryStatus) -> bool {
        matches!(
            (self, to),
            (DeliveryStatus::Pending, DeliveryStatus::Delivered)
                | (DeliveryStatus::Pending, DeliveryStatus::Failed)
        )
    }
}

/// チャットメッセージ
///
/// 生成後に変化するのは `status` のみ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub recipient_id: UserId,
    pub payload: Payload,
    pub server_timestamp: Timestamp,
    pub status: DeliveryStatus,
}

impl Message {
    /// Create a new pending message
    pub fn new(
        conversation_id: ConversationId,
        sender_id: UserId,
        recipient_id: UserId,
        payload: Payload,
        server_timestamp: Timestamp,
    ) -> Self {
        Self {
            id: MessageId::generate(),
            conversation_id,
            sender_id,
            recipient_id,
            payload,
            server_timestamp,
            status: DeliveryStatus::Pending,
        }
    }

    pub fn transition_to(&mut self, to: DeliveryStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(to) {
            return Err(DomainError::InvalidStatusTransition {
                id: self.id,
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
