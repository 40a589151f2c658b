//! Domain logic for client-side operations.
//!
//! Pure functions without side effects, tested in isolation.

use dengon_server::infrastructure::dto::websocket::{CHAT_DESTINATION, ChatFrame, ClientFrame};

use crate::error::ClientError;

/// A chat the user typed: `@bob see you at 7`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingChat {
    pub recipient_id: String,
    pub payload: String,
}

impl OutgoingChat {
    /// Build the wire frame, tagging it with `client_ref` for ack correlation
    pub fn into_frame(self, client_ref: String) -> ClientFrame {
        ClientFrame::Chat(ChatFrame {
            destination: CHAT_DESTINATION.to_string(),
            recipient_id: self.recipient_id,
            payload: self.payload,
            client_ref: Some(client_ref),
        })
    }
}

/// Parse one input line of the form `@recipient message text`
pub fn parse_input(line: &str) -> Result<OutgoingChat, ClientError> {
    let line = line.trim();
    let Some(rest) = line.strip_prefix('@') else {
        return Err(ClientError::InvalidInput(
            "start the line with @recipient".to_string(),
        ));
    };

    let (recipient_id, payload) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
    let payload = payload.trim();
    if recipient_id.is_empty() {
        return Err(ClientError::InvalidInput("missing recipient".to_string()));
    }
    if payload.is_empty() {
        return Err(ClientError::InvalidInput(format!(
            "no message for @{}",
            recipient_id
        )));
    }

    Ok(OutgoingChat {
        recipient_id: recipient_id.to_string(),
        payload: payload.to_string(),
    })
}

/// Check if the client should exit immediately based on the error type.
///
/// A rejected user id will be rejected again on every reconnect.
pub fn should_exit_immediately(error: &ClientError) -> bool {
    matches!(error, ClientError::InvalidUserId(_))
}

/// Check if the client should attempt to reconnect.
///
/// # Arguments
///
/// * `error` - The client error that occurred
/// * `current_attempt` - The current reconnection attempt count (0-indexed)
/// * `max_attempts` - The maximum number of reconnection attempts allowed
pub fn should_attempt_reconnect(
    error: &ClientError,
    current_attempt: u32,
    max_attempts: u32,
) -> bool {
    if should_exit_immediately(error) {
        return false;
    }

    current_attempt < max_attempts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input_with_recipient_and_message() {
        // テスト項目: "@recipient message" 形式の入力が宛先と本文に分割される
        // given (前提条件):
        let line = "@bob  see you at 7 ";

        // when (操作):
        let result = parse_input(line);

        // then (期待する結果):
        assert_eq!(
            result,
            Ok(OutgoingChat {
                recipient_id: "bob".to_string(),
                payload: "see you at 7".to_string(),
            })
        );
    }

    #[test]
    fn test_parse_input_without_at_sign() {
        // テスト項目: @ で始まらない入力はエラーになる
        // when (操作):
        let result = parse_input("hello bob");

        // then (期待する結果):
        assert!(matches!(result, Err(ClientError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_input_without_message() {
        // テスト項目: 本文のない入力はエラーになる
        // when (操作):
        let only_recipient = parse_input("@bob");
        let only_at = parse_input("@ hi");

        // then (期待する結果):
        assert!(matches!(only_recipient, Err(ClientError::InvalidInput(_))));
        assert!(matches!(only_at, Err(ClientError::InvalidInput(_))));
    }

    #[test]
    fn test_into_frame_targets_chat_destination() {
        // テスト項目: 入力から作ったフレームは /app/chat 宛てで client_ref を持つ
        // given (前提条件):
        let chat = parse_input("@carol hi").unwrap();

        // when (操作):
        let ClientFrame::Chat(frame) = chat.into_frame("c-3".to_string());

        // then (期待する結果):
        assert_eq!(frame.destination, CHAT_DESTINATION);
        assert_eq!(frame.recipient_id, "carol");
        assert_eq!(frame.client_ref.as_deref(), Some("c-3"));
    }

    #[test]
    fn test_should_exit_immediately_with_invalid_user_id() {
        // テスト項目: InvalidUserId エラーの場合、即座に終了すべきと判定される
        // given (前提条件):
        let error = ClientError::InvalidUserId("bad id".to_string());

        // when (操作):
        let result = should_exit_immediately(&error);

        // then (期待する結果):
        assert!(result);
        assert!(!should_attempt_reconnect(&error, 0, 5));
    }

    #[test]
    fn test_should_attempt_reconnect_within_limit() {
        // テスト項目: 再接続回数が上限未満の場合、再接続すべきと判定される
        // given (前提条件):
        let error = ClientError::ConnectionError("network error".to_string());

        // when (操作) / then (期待する結果):
        assert!(should_attempt_reconnect(&error, 0, 5));
        assert!(should_attempt_reconnect(&error, 4, 5));
    }

    #[test]
    fn test_should_attempt_reconnect_at_limit() {
        // テスト項目: 再接続回数が上限に達した場合、再接続すべきではないと判定される
        // given (前提条件):
        let error = ClientError::ConnectionError("network error".to_string());

        // when (操作):
        let result = should_attempt_reconnect(&error, 5, 5);

        // then (期待する結果):
        assert!(!result);
    }
}
