//! JSON codec for WebSocket frames.

use thiserror::Error;

use crate::{
    domain::ValueObjectError,
    routing::{FrameEncoder, Outbound},
};

use super::websocket::{
    CHAT_DESTINATION, ClientFrame, Envelope, ErrorCode, FrameHeader, ServerFrame, WIRE_VERSION,
};

/// Frame decoding failures
#[derive(Debug, Error)]
pub enum WireError {
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("unsupported wire version {0} (expected {expected})", expected = WIRE_VERSION)]
    UnsupportedVersion(u64),

    #[error("unknown destination '{0}' (expected '{expected}')", expected = CHAT_DESTINATION)]
    UnknownDestination(String),

    #[error("invalid frame content: {0}")]
    Invalid(#[from] ValueObjectError),
}

impl WireError {
    pub fn code(&self) -> ErrorCode {
        match self {
            WireError::Malformed(_) => ErrorCode::Malformed,
            WireError::UnsupportedVersion(_) => ErrorCode::UnsupportedVersion,
            WireError::UnknownDestination(_) => ErrorCode::UnknownDestination,
            WireError::Invalid(_) => ErrorCode::Validation,
        }
    }
}

/// Encodes and decodes versioned frames
#[derive(Debug, Clone, Copy, Default)]
pub struct WireCodec;

impl WireCodec {
    fn check_version(text: &str) -> Result<(), WireError> {
        let header: FrameHeader = serde_json::from_str(text)?;
        if header.v != u64::from(WIRE_VERSION) {
            return Err(WireError::UnsupportedVersion(header.v));
        }
        Ok(())
    }

    /// Decode an inbound frame, rejecting other versions and destinations.
    pub fn decode_client(text: &str) -> Result<ClientFrame, WireError> {
        Self::check_version(text)?;
        let envelope: Envelope<ClientFrame> = serde_json::from_str(text)?;
        let ClientFrame::Chat(chat) = &envelope.frame;
        if chat.destination != CHAT_DESTINATION {
            return Err(WireError::UnknownDestination(chat.destination.clone()));
        }
        Ok(envelope.frame)
    }

    pub fn encode_client(frame: &ClientFrame) -> Result<String, WireError> {
        Ok(serde_json::to_string(&Envelope::new(frame))?)
    }

    pub fn decode_server(text: &str) -> Result<ServerFrame, WireError> {
        Self::check_version(text)?;
        let envelope: Envelope<ServerFrame> = serde_json::from_str(text)?;
        Ok(envelope.frame)
    }

    pub fn encode_server(frame: &ServerFrame) -> Result<String, serde_json::Error> {
        serde_json::to_string(&Envelope::new(frame))
    }
}

impl FrameEncoder for WireCodec {
    fn encode(&self, item: &Outbound) -> Result<String, serde_json::Error> {
        Self::encode_server(&ServerFrame::from(item))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::{ConversationId, Message, Payload, Timestamp, UserId},
        infrastructure::dto::websocket::ChatFrame,
    };

    fn message() -> Message {
        Message::new(
            ConversationId::generate(),
            UserId::new("alice").unwrap(),
            UserId::new("bob").unwrap(),
            Payload::new("hello").unwrap(),
            Timestamp::new(1000),
        )
    }

    #[test]
    fn test_decode_chat_frame() {
        // テスト項目: バージョン 1 の chat フレームをデコードできる
        // given (前提条件):
        let text = r#"{"v":1,"type":"chat","destination":"/app/chat","recipient_id":"bob","payload":"hi","client_ref":"c-1"}"#;

        // when (操作):
        let frame = WireCodec::decode_client(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            frame,
            ClientFrame::Chat(ChatFrame {
                destination: "/app/chat".to_string(),
                recipient_id: "bob".to_string(),
                payload: "hi".to_string(),
                client_ref: Some("c-1".to_string()),
            })
        );
    }

    #[test]
    fn test_decode_rejects_other_version() {
        // テスト項目: 異なるバージョンのフレームは UnsupportedVersion で拒否される
        // given (前提条件):
        let text = r#"{"v":2,"type":"chat","destination":"/app/chat","recipient_id":"bob","payload":"hi"}"#;

        // when (操作):
        let result = WireCodec::decode_client(text);

        // then (期待する結果):
        assert!(matches!(result, Err(WireError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_decode_reports_large_version_as_unsupported() {
        // テスト項目: u8 に収まらないバージョンも Malformed ではなく UnsupportedVersion になる
        // given (前提条件):
        let text = r#"{"v":256,"type":"chat","destination":"/app/chat","recipient_id":"bob","payload":"hi"}"#;

        // when (操作):
        let result = WireCodec::decode_client(text);

        // then (期待する結果):
        assert!(matches!(result, Err(WireError::UnsupportedVersion(256))));
        assert_eq!(result.unwrap_err().code(), ErrorCode::UnsupportedVersion);
    }

    #[test]
    fn test_error_messages_name_expected_values() {
        // テスト項目: エラーメッセージに期待するバージョンと宛先が含まれる
        // when (操作):
        let version = WireError::UnsupportedVersion(9).to_string();
        let destination = WireError::UnknownDestination("/topic/all".to_string()).to_string();

        // then (期待する結果):
        assert_eq!(version, "unsupported wire version 9 (expected 1)");
        assert_eq!(
            destination,
            "unknown destination '/topic/all' (expected '/app/chat')"
        );
    }

    #[test]
    fn test_decode_rejects_unknown_destination() {
        // テスト項目: /app/chat 以外の宛先は UnknownDestination で拒否される
        // given (前提条件):
        let text = r#"{"v":1,"type":"chat","destination":"/topic/all","recipient_id":"bob","payload":"hi"}"#;

        // when (操作):
        let result = WireCodec::decode_client(text);

        // then (期待する結果):
        assert!(matches!(result, Err(WireError::UnknownDestination(d)) if d == "/topic/all"));
    }

    #[test]
    fn test_decode_rejects_plain_text() {
        // テスト項目: JSON でない入力は Malformed になる
        // when (操作):
        let result = WireCodec::decode_client("hello bob");

        // then (期待する結果):
        assert!(matches!(result, Err(WireError::Malformed(_))));
        assert_eq!(result.unwrap_err().code(), ErrorCode::Malformed);
    }

    #[test]
    fn test_encoded_message_carries_version_and_type() {
        // テスト項目: エンコードしたメッセージフレームは v と type を持ち、サーバーフレームとして読み戻せる
        // given (前提条件):
        let message = message();

        // when (操作):
        let text = WireCodec.encode(&Outbound::Chat(message.clone())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let decoded = WireCodec::decode_server(&text).unwrap();

        // then (期待する結果):
        assert_eq!(value["v"], 1);
        assert_eq!(value["type"], "message");
        assert_eq!(value["payload"], "hello");
        assert_eq!(value["status"], "pending");
        let ServerFrame::Message(frame) = decoded else {
            panic!("expected message frame");
        };
        assert_eq!(Message::try_from(frame).unwrap(), message);
    }
}
