//! UseCase: メッセージ送信処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SendMessageUseCase::execute() メソッド
//! - 受信フレームのデコード、Router への dispatch、送信者への ack / error 通知
//!
//! ### なぜこのテストが必要か
//! - 送信したメッセージには必ず ack か error のどちらかが返ることを保証
//! - 不正なフレームが Router に届かないことを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：受信者がオンライン / オフライン
//! - 異常系：JSON でないフレーム、不正な宛先、不正な受信者 ID

use std::sync::Arc;

use crate::{
    infrastructure::dto::{
        WireCodec, WireError,
        websocket::{ChatFrame, ClientFrame},
    },
    routing::{ConnectionHandle, DispatchReceipt, Notice, RefusedFrame, Router, RoutingError},
};

use super::error::SendMessageError;

/// メッセージ送信のユースケース
pub struct SendMessageUseCase {
    router: Arc<Router>,
}

impl SendMessageUseCase {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    /// 受信したテキストフレームを処理する
    ///
    /// # Arguments
    ///
    /// * `sender` - フレームを受信した接続（ack / error の返送先）
    /// * `text` - 受信したテキストフレーム
    ///
    /// # Returns
    ///
    /// * `Ok(DispatchReceipt)` - dispatch 成功（ack は送信者のキューに投入済み）
    /// * `Err(SendMessageError)` - 拒否（error フレームは送信者のキューに投入済み）
    pub async fn execute(
        &self,
        sender: &ConnectionHandle,
        text: &str,
    ) -> Result<DispatchReceipt, SendMessageError> {
        let frame = match WireCodec::decode_client(text) {
            Ok(ClientFrame::Chat(frame)) => frame,
            Err(e) => {
                tracing::warn!(
                    "Refused frame from '{}' on connection {}: {}",
                    sender.user_id(),
                    sender.id(),
                    e
                );
                self.router.notify(sender, refusal(&e));
                return Err(e.into());
            }
        };

        let ChatFrame {
            recipient_id,
            payload,
            client_ref,
            ..
        } = frame;

        match self
            .router
            .dispatch(sender.user_id(), &recipient_id, &payload)
            .await
        {
            Ok(receipt) => {
                self.router.notify(
                    sender,
                    Notice::Ack {
                        client_ref,
                        receipt: receipt.clone(),
                    },
                );
                Ok(receipt)
            }
            Err(error) => {
                tracing::warn!(
                    "Dispatch from '{}' to '{}' failed: {}",
                    sender.user_id(),
                    recipient_id,
                    error
                );
                self.router.notify(
                    sender,
                    Notice::Rejected {
                        client_ref,
                        error: error.clone(),
                    },
                );
                Err(error.into())
            }
        }
    }
}

fn refusal(error: &WireError) -> Notice {
    let reason = match error {
        WireError::Malformed(_) => RefusedFrame::Unparseable,
        WireError::UnsupportedVersion(_) => RefusedFrame::UnsupportedVersion,
        WireError::UnknownDestination(_) => RefusedFrame::UnknownDestination,
        WireError::Invalid(e) => {
            return Notice::Rejected {
                client_ref: None,
                error: RoutingError::Validation(e.clone()),
            };
        }
    };
    Notice::Refused {
        reason,
        detail: error.to_string(),
    }
}
