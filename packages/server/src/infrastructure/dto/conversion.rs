//! Conversion logic between DTOs and domain entities.

use dengon_shared::time::timestamp_to_rfc3339;

use crate::{
    domain::{
        Connection, Conversation, ConversationId, DeliveryStatus, Message, MessageId, Payload,
        Timestamp, UserId,
    },
    infrastructure::dto::{codec::WireError, http, websocket as dto},
    routing::{DispatchOutcome, DispatchReceipt, Notice, Outbound, RefusedFrame, RoutingError},
};

// ========================================
// DTO → Domain Entity
// ========================================

impl TryFrom<dto::MessageFrame> for Message {
    type Error = WireError;

    fn try_from(frame: dto::MessageFrame) -> Result<Self, Self::Error> {
        Ok(Self {
            id: frame.id.parse::<MessageId>()?,
            conversation_id: frame.conversation_id.parse::<ConversationId>()?,
            sender_id: UserId::new(frame.sender_id)?,
            recipient_id: UserId::new(frame.recipient_id)?,
            payload: Payload::new(frame.payload)?,
            server_timestamp: Timestamp::new(frame.server_timestamp),
            status: frame.status,
        })
    }
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<&Message> for dto::MessageFrame {
    fn from(model: &Message) -> Self {
        Self {
            destination: dto::user_queue_destination(model.recipient_id.as_str()),
            id: model.id.to_string(),
            conversation_id: model.conversation_id.to_string(),
            sender_id: model.sender_id.to_string(),
            recipient_id: model.recipient_id.to_string(),
            payload: model.payload.as_str().to_string(),
            server_timestamp: model.server_timestamp.value(),
            status: model.status,
        }
    }
}

impl From<&Connection> for dto::WelcomeFrame {
    fn from(model: &Connection) -> Self {
        Self {
            connection_id: model.id.to_string(),
            user_id: model.user_id.to_string(),
            connected_at: model.connected_at.value(),
        }
    }
}

/// Build the ack for a dispatch result
pub fn ack_frame(receipt: &DispatchReceipt, client_ref: Option<String>) -> dto::AckFrame {
    let (outcome, connections, reason) = match receipt.outcome {
        DispatchOutcome::Queued { connections } => {
            (dto::AckOutcome::Queued, Some(connections), None)
        }
        DispatchOutcome::OfflinePending => (
            dto::AckOutcome::OfflinePending,
            None,
            Some("recipient offline, kept for redelivery".to_string()),
        ),
        DispatchOutcome::Failed(reason) => (
            dto::AckOutcome::Failed,
            None,
            Some(format!("{:?}", reason)),
        ),
    };

    dto::AckFrame {
        message_id: receipt.message_id.to_string(),
        conversation_id: receipt.conversation_id.to_string(),
        client_ref,
        outcome,
        status: receipt.status(),
        server_timestamp: receipt.server_timestamp.value(),
        connections,
        reason,
    }
}

impl From<&RoutingError> for dto::ErrorCode {
    fn from(error: &RoutingError) -> Self {
        match error {
            RoutingError::Validation(_) => dto::ErrorCode::Validation,
            RoutingError::NotFound => dto::ErrorCode::NotFound,
            RoutingError::Timeout { .. } => dto::ErrorCode::Timeout,
            RoutingError::ConnectionLost(_) => dto::ErrorCode::ConnectionLost,
            RoutingError::Store { .. } => dto::ErrorCode::Store,
        }
    }
}

impl From<RefusedFrame> for dto::ErrorCode {
    fn from(reason: RefusedFrame) -> Self {
        match reason {
            RefusedFrame::Unparseable => dto::ErrorCode::Malformed,
            RefusedFrame::UnsupportedVersion => dto::ErrorCode::UnsupportedVersion,
            RefusedFrame::UnknownDestination => dto::ErrorCode::UnknownDestination,
        }
    }
}

/// Build the error frame for a refused dispatch
pub fn error_frame(error: &RoutingError, client_ref: Option<String>) -> dto::ErrorFrame {
    dto::ErrorFrame {
        code: error.into(),
        message: error.to_string(),
        client_ref,
    }
}

impl From<&Notice> for dto::ServerFrame {
    fn from(notice: &Notice) -> Self {
        match notice {
            Notice::Welcome(connection) => dto::ServerFrame::Welcome(connection.into()),
            Notice::Ack {
                client_ref,
                receipt,
            } => dto::ServerFrame::Ack(ack_frame(receipt, client_ref.clone())),
            Notice::Rejected { client_ref, error } => {
                dto::ServerFrame::Error(error_frame(error, client_ref.clone()))
            }
            Notice::Refused { reason, detail } => dto::ServerFrame::Error(dto::ErrorFrame {
                code: (*reason).into(),
                message: detail.clone(),
                client_ref: None,
            }),
            Notice::Delivered {
                message_id,
                conversation_id,
                recipient_id,
                delivered_at,
            } => dto::ServerFrame::Receipt(dto::ReceiptFrame {
                message_id: message_id.to_string(),
                conversation_id: conversation_id.to_string(),
                recipient_id: recipient_id.to_string(),
                status: DeliveryStatus::Delivered,
                delivered_at: delivered_at.value(),
            }),
        }
    }
}

impl From<&Outbound> for dto::ServerFrame {
    fn from(item: &Outbound) -> Self {
        match item {
            Outbound::Chat(message) => dto::ServerFrame::Message(message.into()),
            Outbound::Notice(notice) => notice.into(),
        }
    }
}

// ========================================
// Domain Entity → HTTP DTO
// ========================================

impl From<&Conversation> for http::ConversationDto {
    fn from(model: &Conversation) -> Self {
        let (low, high) = model.key.participants();
        Self {
            id: model.id.to_string(),
            participants: [low.to_string(), high.to_string()],
            initiator: model.initiator.to_string(),
            created_at: timestamp_to_rfc3339(model.created_at.value()),
            last_activity_at: timestamp_to_rfc3339(model.last_activity_at.value()),
        }
    }
}

impl From<&Message> for http::MessageDto {
    fn from(model: &Message) -> Self {
        Self {
            id: model.id.to_string(),
            sender_id: model.sender_id.to_string(),
            recipient_id: model.recipient_id.to_string(),
            payload: model.payload.as_str().to_string(),
            server_timestamp: model.server_timestamp.value(),
            sent_at: timestamp_to_rfc3339(model.server_timestamp.value()),
            status: model.status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::FailureReason;

    fn user(id: &str) -> UserId {
        UserId::new(id).unwrap()
    }

    fn sample_message() -> Message {
        let mut message = Message::new(
            ConversationId::generate(),
            user("alice"),
            user("bob"),
            Payload::new("こんにちは").unwrap(),
            Timestamp::new(1_700_000_000_123),
        );
        message.transition_to(DeliveryStatus::Delivered).unwrap();
        message
    }

    #[test]
    fn test_message_frame_preserves_every_field() {
        // テスト項目: Message -> MessageFrame -> Message で全フィールドが保たれる
        // given (前提条件):
        let message = sample_message();

        // when (操作):
        let frame = dto::MessageFrame::from(&message);
        let restored = Message::try_from(frame.clone()).unwrap();

        // then (期待する結果):
        assert_eq!(restored, message);
        assert_eq!(frame.destination, "/user/bob/queue/messages");
    }

    #[test]
    fn test_message_frame_with_invalid_ids_is_rejected() {
        // テスト項目: 不正な ID を含む MessageFrame はドメインに変換できない
        // given (前提条件):
        let mut frame = dto::MessageFrame::from(&sample_message());
        frame.id = "not-a-uuid".to_string();

        // when (操作):
        let result = Message::try_from(frame);

        // then (期待する結果):
        assert!(matches!(result, Err(WireError::Invalid(_))));
    }

    #[test]
    fn test_ack_frame_reports_outcome() {
        // テスト項目: DispatchReceipt の結果が ack の outcome / status / reason に反映される
        // given (前提条件):
        let receipt = DispatchReceipt {
            message_id: MessageId::generate(),
            conversation_id: ConversationId::generate(),
            server_timestamp: Timestamp::new(10),
            outcome: DispatchOutcome::Failed(FailureReason::OfflineRecipient),
        };

        // when (操作):
        let ack = ack_frame(&receipt, Some("c-1".to_string()));

        // then (期待する結果):
        assert_eq!(ack.outcome, dto::AckOutcome::Failed);
        assert_eq!(ack.status, DeliveryStatus::Failed);
        assert_eq!(ack.client_ref.as_deref(), Some("c-1"));
        assert_eq!(ack.reason.as_deref(), Some("OfflineRecipient"));
        assert_eq!(ack.message_id, receipt.message_id.to_string());
    }

    #[test]
    fn test_conversation_dto_uses_rfc3339_times() {
        // テスト項目: 会話の HTTP DTO は参加者を整列し、時刻を RFC 3339 で表す
        // given (前提条件):
        let conversation = Conversation::start(user("bob"), user("alice"), Timestamp::new(0));

        // when (操作):
        let dto = http::ConversationDto::from(&conversation);

        // then (期待する結果):
        assert_eq!(dto.participants, ["alice".to_string(), "bob".to_string()]);
        assert_eq!(dto.initiator, "bob");
        assert!(dto.created_at.starts_with("1970-01-01T00:00:00"));
    }
}
