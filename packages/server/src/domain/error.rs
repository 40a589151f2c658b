//! Domain-level error types.

use thiserror::Error;

use super::entity::DeliveryStatus;
use super::value_object::MessageId;

/// Validation failures raised while constructing value objects
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("user id must not be empty")]
    EmptyUserId,

    #[error("user id must be at most {max} characters")]
    UserIdTooLong { max: usize },

    #[error("user id contains invalid character {0:?}")]
    InvalidUserIdChar(char),

    #[error("payload must not be empty")]
    EmptyPayload,

    #[error("payload must be at most {max} characters")]
    PayloadTooLong { max: usize },

    #[error("invalid identifier: '{0}'")]
    InvalidIdentifier(String),

    #[error("sender and recipient must differ")]
    SelfAddressed,
}

/// Invariant violations of domain entities
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("message {id}: status cannot change from {from:?} to {to:?}")]
    InvalidStatusTransition {
        id: MessageId,
        from: DeliveryStatus,
        to: DeliveryStatus,
    },
}

/// Durable store errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("store operation timed out")]
    Timeout,

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("message not found: {0}")]
    MessageNotFound(MessageId),
}

impl StoreError {
    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, StoreError::Timeout | StoreError::Unavailable(_))
    }
}

/// Transport errors reported by a frame sink
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("transport send failed: {0}")]
    SendFailed(String),
}
