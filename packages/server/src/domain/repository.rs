//! Repository trait 定義
//!
//! ドメイン層が必要とする永続化ストアのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。

use async_trait::async_trait;

use super::{
    Conversation, ConversationId, DeliveryStatus, Message, MessageId, StoreError, Timestamp,
    UserId,
};

/// Chat Store trait
///
/// 会話とメッセージの永続化を担うデータストアへのインターフェース。
/// Router と ConversationIndex はこの trait に依存し、具体的な実装には依存しない。
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// 会話を保存（同じ ID なら上書き）
    async fn save_conversation(&self, conversation: Conversation) -> Result<(), StoreError>;

    /// 順序を持たない参加者の組で会話を検索
    async fn find_conversation(
        &self,
        a: &UserId,
        b: &UserId,
    ) -> Result<Option<Conversation>, StoreError>;

    /// 開始者 `sender` から `recipient` への会話を検索（方向つき）
    async fn find_conversation_by_sender_and_recipient(
        &self,
        sender: &UserId,
        recipient: &UserId,
    ) -> Result<Option<Conversation>, StoreError>;

    /// 会話の最終アクティビティ時刻を更新
    async fn touch_conversation(
        &self,
        id: ConversationId,
        at: Timestamp,
    ) -> Result<(), StoreError>;

    /// メッセージを保存
    async fn save_message(&self, message: Message) -> Result<(), StoreError>;

    /// Pending のメッセージの状態を遷移させる
    ///
    /// 遷移した場合は `true`、すでに終端状態だった場合は `false` を返す。
    async fn transition_status(
        &self,
        id: MessageId,
        to: DeliveryStatus,
    ) -> Result<bool, StoreError>;

    /// 受信者宛ての Pending メッセージを保存順に取得
    async fn pending_for_recipient(&self, recipient: &UserId) -> Result<Vec<Message>, StoreError>;

    /// 会話のメッセージ履歴を保存順に取得
    async fn conversation_history(&self, id: ConversationId) -> Result<Vec<Message>, StoreError>;
}
