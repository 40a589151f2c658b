//! UseCase 層のエラー型

use thiserror::Error;

use crate::{domain::ValueObjectError, infrastructure::dto::WireError, routing::RoutingError};

/// 接続時のエラー
#[derive(Debug, Error, PartialEq)]
pub enum ConnectError {
    #[error("invalid user id: {0}")]
    InvalidUserId(#[from] ValueObjectError),
}

/// メッセージ送信時のエラー
///
/// どちらの場合も送信者の接続には error フレームが送られている。
#[derive(Debug, Error)]
pub enum SendMessageError {
    #[error("inbound frame refused: {0}")]
    Wire(#[from] WireError),

    #[error("dispatch failed: {0}")]
    Routing(#[from] RoutingError),
}

/// 会話の検索・履歴取得時のエラー
#[derive(Debug, Error, PartialEq)]
pub enum QueryError {
    #[error("invalid query parameter: {0}")]
    InvalidParameter(#[from] ValueObjectError),

    #[error("conversation not found")]
    NotFound,

    #[error("store unavailable: {0}")]
    Unavailable(RoutingError),
}

impl From<RoutingError> for QueryError {
    fn from(error: RoutingError) -> Self {
        match error {
            RoutingError::NotFound => QueryError::NotFound,
            RoutingError::Validation(e) => QueryError::InvalidParameter(e),
            other => QueryError::Unavailable(other),
        }
    }
}
