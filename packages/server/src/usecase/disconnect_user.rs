//! UseCase: ユーザー切断処理
//!
//! 接続を登録解除する。Writer が配送しきれなかったメッセージは Pending のまま残り、
//! 次の再接続で順番どおりに再配送される。

use std::sync::Arc;

use crate::routing::{RegistrationToken, Router, WriterExit};

/// ユーザー切断のユースケース
pub struct DisconnectUserUseCase {
    router: Arc<Router>,
}

impl DisconnectUserUseCase {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    /// 切断を実行
    ///
    /// # Returns
    ///
    /// 配送されずに Pending のまま残ったメッセージ数
    pub fn execute(&self, token: &RegistrationToken, exit: WriterExit) -> usize {
        if let Some(error) = &exit.error {
            tracing::warn!(
                "Connection {} of '{}' ended with error: {}",
                token.connection_id(),
                token.user_id(),
                error
            );
        }
        self.router.detach(token, exit.in_flight)
    }
}
