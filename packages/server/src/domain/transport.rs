//! Transport trait 定義
//!
//! 接続 1 本に対してシリアライズ済みフレームを送る送信口のインターフェース。
//! WebSocket などの具体的な実装は Infrastructure 層が提供します。

use async_trait::async_trait;

use super::TransportError;

/// Frame Sink trait
///
/// 1 つの接続に紐づく送信口。DeliveryWriter だけが呼び出す。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FrameSink: Send {
    /// シリアライズ済みのフレームを送信
    async fn send(&mut self, frame: String) -> Result<(), TransportError>;

    /// 送信口を閉じる（失敗しても無視してよい）
    async fn close(&mut self) {}
}
