//! UseCase: ユーザー接続処理
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectUserUseCase::execute() と start_delivery()
//!
//! ### なぜこのテストが必要か
//! - 接続時に welcome が最初のフレームとして届くことを保証
//! - オフライン中に保留されたメッセージが再接続で配送されることを確認
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規接続、保留メッセージの再配送
//! - 異常系：不正な user_id

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::{
    domain::{FrameSink, UserId},
    routing::{Attachment, Router, WriterExit},
};

use super::error::ConnectError;

/// ユーザー接続のユースケース
pub struct ConnectUserUseCase {
    router: Arc<Router>,
}

impl ConnectUserUseCase {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    /// 接続要求の user_id を検証する（WebSocket のアップグレード前に呼ぶ）
    pub fn validate(user_id: &str) -> Result<UserId, ConnectError> {
        Ok(UserId::new(user_id)?)
    }

    /// 接続を登録する
    ///
    /// 同じユーザーの複数接続（複数デバイス）を許可する。
    pub fn execute(&self, user_id: UserId) -> Attachment {
        self.router.attach(user_id)
    }

    /// Writer を起動し、保留中のメッセージを再投入する
    ///
    /// Writer を先に起動するので、保留が多くても再投入が詰まることはない。
    /// 再投入が終わると接続は live になり、以降のチャットを受け取る。
    pub async fn start_delivery<S>(
        &self,
        attachment: &Attachment,
        sink: S,
    ) -> JoinHandle<WriterExit>
    where
        S: FrameSink + 'static,
    {
        let writer = tokio::spawn(self.router.writer(&attachment.handle, sink).run());
        let redelivered = self.router.redeliver_pending(&attachment.handle).await;
        if redelivered > 0 {
            tracing::info!(
                "Queued {} pending message(s) for '{}'",
                redelivered,
                attachment.handle.user_id()
            );
        }
        writer
    }
}
