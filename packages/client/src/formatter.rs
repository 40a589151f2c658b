//! Frame formatting utilities for client display.
//!
//! Timestamps are shown as local wall-clock time.

use dengon_server::infrastructure::dto::websocket::{
    AckFrame, AckOutcome, ErrorFrame, MessageFrame, ReceiptFrame, ServerFrame, WelcomeFrame,
};
use dengon_shared::time::timestamp_to_local_hms;

const RULE: &str = "------------------------------------------------------------";

/// Frame formatter for client display
pub struct FrameFormatter;

impl FrameFormatter {
    /// Format any server frame
    pub fn format_frame(frame: &ServerFrame) -> String {
        match frame {
            ServerFrame::Welcome(welcome) => Self::format_welcome(welcome),
            ServerFrame::Message(message) => Self::format_message(message),
            ServerFrame::Ack(ack) => Self::format_ack(ack),
            ServerFrame::Receipt(receipt) => Self::format_receipt(receipt),
            ServerFrame::Error(error) => Self::format_error(error),
        }
    }

    pub fn format_welcome(welcome: &WelcomeFrame) -> String {
        format!(
            "\nConnected as '{}' at {} (connection {})\n",
            welcome.user_id,
            timestamp_to_local_hms(welcome.connected_at),
            welcome.connection_id
        )
    }

    /// Format an incoming chat message
    pub fn format_message(message: &MessageFrame) -> String {
        format!(
            "\n\n{}\n@{}: {}\nsent at {}\n{}\n",
            RULE,
            message.sender_id,
            message.payload,
            timestamp_to_local_hms(message.server_timestamp),
            RULE
        )
    }

    /// Format the server's answer to one of our sends
    pub fn format_ack(ack: &AckFrame) -> String {
        let at = timestamp_to_local_hms(ack.server_timestamp);
        match ack.outcome {
            AckOutcome::Queued => format!(
                "\nsent at {} to {} device(s)\n",
                at,
                ack.connections.unwrap_or(0)
            ),
            AckOutcome::OfflinePending => {
                format!("\nsaved at {}, recipient is offline\n", at)
            }
            AckOutcome::Failed => format!(
                "\nnot delivered ({})\n",
                ack.reason.as_deref().unwrap_or("unknown reason")
            ),
        }
    }

    /// Format a delivery receipt for a message we sent
    pub fn format_receipt(receipt: &ReceiptFrame) -> String {
        format!(
            "\n{} received your message at {}\n",
            receipt.recipient_id,
            timestamp_to_local_hms(receipt.delivered_at)
        )
    }

    pub fn format_error(error: &ErrorFrame) -> String {
        format!("\n! {:?}: {}\n", error.code, error.message)
    }

    /// Format a raw text message (when decoding fails)
    pub fn format_raw_message(text: &str) -> String {
        format!("\n← Received: {}\n", text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dengon_server::{
        domain::DeliveryStatus, infrastructure::dto::websocket::ErrorCode,
    };

    fn ack(outcome: AckOutcome) -> AckFrame {
        AckFrame {
            message_id: "m-1".to_string(),
            conversation_id: "c-1".to_string(),
            client_ref: Some("r-1".to_string()),
            outcome,
            status: DeliveryStatus::Pending,
            server_timestamp: 1672498800000,
            connections: Some(2),
            reason: Some("Timeout".to_string()),
        }
    }

    #[test]
    fn test_format_message() {
        // テスト項目: チャットメッセージが送信者と本文つきでフォーマットされる
        // given (前提条件):
        let frame = ServerFrame::Message(MessageFrame {
            destination: "/user/bob/queue/messages".to_string(),
            id: "m-1".to_string(),
            conversation_id: "c-1".to_string(),
            sender_id: "alice".to_string(),
            recipient_id: "bob".to_string(),
            payload: "Hello, world!".to_string(),
            server_timestamp: 1672498800000,
            status: DeliveryStatus::Pending,
        });

        // when (操作):
        let result = FrameFormatter::format_frame(&frame);

        // then (期待する結果):
        assert!(result.contains("@alice: Hello, world!"));
        assert!(result.contains("sent at"));
        assert!(result.contains(RULE));
    }

    #[test]
    fn test_format_ack_outcomes() {
        // テスト項目: ack の結果ごとに表示が変わる
        // when (操作):
        let queued = FrameFormatter::format_ack(&ack(AckOutcome::Queued));
        let pending = FrameFormatter::format_ack(&ack(AckOutcome::OfflinePending));
        let failed = FrameFormatter::format_ack(&ack(AckOutcome::Failed));

        // then (期待する結果):
        assert!(queued.contains("2 device(s)"));
        assert!(pending.contains("recipient is offline"));
        assert!(failed.contains("not delivered (Timeout)"));
    }

    #[test]
    fn test_format_welcome_and_receipt() {
        // テスト項目: welcome と receipt がユーザー名つきでフォーマットされる
        // given (前提条件):
        let welcome = WelcomeFrame {
            connection_id: "conn-1".to_string(),
            user_id: "alice".to_string(),
            connected_at: 1672498800000,
        };
        let receipt = ReceiptFrame {
            message_id: "m-1".to_string(),
            conversation_id: "c-1".to_string(),
            recipient_id: "bob".to_string(),
            status: DeliveryStatus::Delivered,
            delivered_at: 1672498800000,
        };

        // when (操作):
        let welcome = FrameFormatter::format_welcome(&welcome);
        let receipt = FrameFormatter::format_receipt(&receipt);

        // then (期待する結果):
        assert!(welcome.contains("Connected as 'alice'"));
        assert!(welcome.contains("conn-1"));
        assert!(receipt.contains("bob received your message"));
    }

    #[test]
    fn test_format_error() {
        // テスト項目: エラーフレームがコードとメッセージつきでフォーマットされる
        // given (前提条件):
        let error = ErrorFrame {
            code: ErrorCode::Validation,
            message: "cannot send a message to yourself".to_string(),
            client_ref: None,
        };

        // when (操作):
        let result = FrameFormatter::format_error(&error);

        // then (期待する結果):
        assert!(result.contains("Validation"));
        assert!(result.contains("yourself"));
    }

    #[test]
    fn test_format_raw_message() {
        // テスト項目: 解釈できないテキストはそのまま表示される
        // when (操作):
        let result = FrameFormatter::format_raw_message("not json");

        // then (期待する結果):
        assert_eq!(result, "\n← Received: not json\n");
    }
}
