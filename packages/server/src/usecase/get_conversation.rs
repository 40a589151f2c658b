//! UseCase: 会話の検索と履歴取得（読み取り専用）

use std::sync::Arc;

use crate::{
    domain::{Conversation, ConversationId, Message, UserId},
    routing::Router,
};

use super::error::QueryError;

/// 参加者の組から会話を検索するユースケース
///
/// 検索だけを行い、会話が存在しなくても作成しない。
pub struct GetConversationUseCase {
    router: Arc<Router>,
}

impl GetConversationUseCase {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    /// 会話を検索
    ///
    /// `directed` が true の場合は `sender_id` が開始した会話だけに一致する。
    pub async fn execute(
        &self,
        sender_id: &str,
        recipient_id: &str,
        directed: bool,
    ) -> Result<Conversation, QueryError> {
        let sender = UserId::new(sender_id)?;
        let recipient = UserId::new(recipient_id)?;

        let index = self.router.index();
        let conversation = if directed {
            index.lookup_directed(&sender, &recipient).await?
        } else {
            index.lookup(&sender, &recipient).await?
        };
        Ok(conversation)
    }
}

/// 会話のメッセージ履歴を取得するユースケース
pub struct GetConversationHistoryUseCase {
    router: Arc<Router>,
}

impl GetConversationHistoryUseCase {
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }

    /// 保存順のメッセージ一覧を返す（会話が存在しなければ空）
    pub async fn execute(&self, conversation_id: &str) -> Result<Vec<Message>, QueryError> {
        let id: ConversationId = conversation_id.parse()?;
        Ok(self.router.history(id).await?)
    }
}
