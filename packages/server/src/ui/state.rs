//! Shared application state.

use std::{sync::Arc, time::Duration};

use crate::usecase::{
    ConnectUserUseCase, DisconnectUserUseCase, GetConversationHistoryUseCase,
    GetConversationUseCase, GetOnlineUsersUseCase, SendMessageUseCase,
};

/// Shared application state
pub struct AppState {
    /// ConnectUserUseCase（ユーザー接続のユースケース）
    pub connect_user_usecase: Arc<ConnectUserUseCase>,
    /// DisconnectUserUseCase（ユーザー切断のユースケース）
    pub disconnect_user_usecase: Arc<DisconnectUserUseCase>,
    /// SendMessageUseCase（メッセージ送信のユースケース）
    pub send_message_usecase: Arc<SendMessageUseCase>,
    /// GetConversationUseCase（会話検索のユースケース）
    pub get_conversation_usecase: Arc<GetConversationUseCase>,
    /// GetConversationHistoryUseCase（会話履歴取得のユースケース）
    pub get_conversation_history_usecase: Arc<GetConversationHistoryUseCase>,
    /// GetOnlineUsersUseCase（オンラインユーザー一覧取得のユースケース）
    pub get_online_users_usecase: Arc<GetOnlineUsersUseCase>,
    /// 受信フレームがこの時間途絶えた接続を閉じる
    pub idle_timeout: Duration,
}
