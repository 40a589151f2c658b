//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::{
    infrastructure::dto::http::{
        ConversationDto, ConversationHistoryDto, MessageDto, OnlineUserDto, OnlineUsersDto,
    },
    ui::state::AppState,
    usecase::QueryError,
};

fn status_for(error: &QueryError) -> StatusCode {
    match error {
        QueryError::InvalidParameter(_) => StatusCode::BAD_REQUEST,
        QueryError::NotFound => StatusCode::NOT_FOUND,
        QueryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

/// Users with at least one live connection
pub async fn get_online_users(State(state): State<Arc<AppState>>) -> Json<OnlineUsersDto> {
    let online = state.get_online_users_usecase.execute();

    // Domain Model から DTO への変換
    Json(OnlineUsersDto {
        users: online
            .users
            .into_iter()
            .map(|(user_id, connections)| OnlineUserDto {
                user_id: user_id.into_string(),
                connections,
            })
            .collect(),
        connections: online.connections,
    })
}

#[derive(Debug, Deserialize)]
pub struct ConversationQuery {
    pub sender_id: String,
    pub recipient_id: String,
    /// Match only conversations started by `sender_id`
    #[serde(default)]
    pub directed: bool,
}

/// Read-only conversation lookup by participant pair
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConversationQuery>,
) -> Result<Json<ConversationDto>, StatusCode> {
    match state
        .get_conversation_usecase
        .execute(&query.sender_id, &query.recipient_id, query.directed)
        .await
    {
        Ok(conversation) => Ok(Json(ConversationDto::from(&conversation))),
        Err(e) => {
            tracing::debug!(
                "Conversation lookup {} -> {} failed: {}",
                query.sender_id,
                query.recipient_id,
                e
            );
            Err(status_for(&e))
        }
    }
}

/// Messages of a conversation, oldest first
pub async fn get_conversation_messages(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationHistoryDto>, StatusCode> {
    let messages = state
        .get_conversation_history_usecase
        .execute(&conversation_id)
        .await
        .map_err(|e| {
            tracing::debug!("History of {} failed: {}", conversation_id, e);
            status_for(&e)
        })?;

    Ok(Json(ConversationHistoryDto {
        conversation_id,
        messages: messages.iter().map(MessageDto::from).collect(),
    }))
}
