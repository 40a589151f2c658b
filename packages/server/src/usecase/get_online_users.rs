//! UseCase: オンラインユーザー一覧の取得

use std::sync::Arc;

use crate::{domain::UserId, routing::ConnectionRegistry};

/// オンラインユーザー一覧
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnlineUsers {
    /// ユーザー ID 順
    pub users: Vec<(UserId, usize)>,
    pub connections: usize,
}

/// オンラインユーザー一覧取得のユースケース
pub struct GetOnlineUsersUseCase {
    registry: Arc<ConnectionRegistry>,
}

impl GetOnlineUsersUseCase {
    pub fn new(registry: Arc<ConnectionRegistry>) -> Self {
        Self { registry }
    }

    pub fn execute(&self) -> OnlineUsers {
        OnlineUsers {
            users: self.registry.online_users(),
            connections: self.registry.connection_count(),
        }
    }
}
