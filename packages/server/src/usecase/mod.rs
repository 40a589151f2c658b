//! UseCase 層
//!
//! UI 層（WebSocket / HTTP ハンドラ）から呼ばれ、Router と ConnectionRegistry を使って処理を行う。

pub mod connect_user;
pub mod disconnect_user;
pub mod error;
pub mod get_conversation;
pub mod get_online_users;
pub mod send_message;

pub use connect_user::ConnectUserUseCase;
pub use disconnect_user::DisconnectUserUseCase;
pub use error::{ConnectError, QueryError, SendMessageError};
pub use get_conversation::{GetConversationHistoryUseCase, GetConversationUseCase};
pub use get_online_users::{GetOnlineUsersUseCase, OnlineUsers};
pub use send_message::SendMessageUseCase;
