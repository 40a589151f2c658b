//! Domain layer: value objects, entities, errors and collaborator traits.

pub mod entity;
pub mod error;
pub mod repository;
pub mod transport;
pub mod value_object;

pub use entity::{Connection, Conversation, DeliveryStatus, Message};
pub use error::{DomainError, StoreError, TransportError, ValueObjectError};
pub use repository::ChatStore;
pub use transport::FrameSink;
pub use value_object::{
    ConnectionId, ConversationId, ConversationKey, MessageId, Payload, Timestamp, UserId,
};

#[cfg(test)]
pub use repository::MockChatStore;
#[cfg(test)]
pub use transport::MockFrameSink;
