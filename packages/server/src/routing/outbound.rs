//! Items that travel through a connection's delivery queue.

use crate::domain::{Connection, ConversationId, Message, MessageId, Timestamp, UserId};

use super::{error::RoutingError, router::DispatchReceipt};

/// One entry of a delivery queue
#[derive(Debug, Clone, PartialEq)]
pub enum Outbound {
    /// A chat message for the connection's user; persisted, kept pending on teardown
    Chat(Message),
    /// A server notice; best effort, never persisted
    Notice(Notice),
}

impl Outbound {
    pub fn as_chat(&self) -> Option<&Message> {
        match self {
            Outbound::Chat(message) => Some(message),
            Outbound::Notice(_) => None,
        }
    }

    pub fn into_chat(self) -> Option<Message> {
        match self {
            Outbound::Chat(message) => Some(message),
            Outbound::Notice(_) => None,
        }
    }
}

/// Server-originated notices
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// First frame on every connection
    Welcome(Connection),
    /// Result of a dispatch, sent back to the sending connection
    Ack {
        client_ref: Option<String>,
        receipt: DispatchReceipt,
    },
    /// A dispatch refused by the router
    Rejected {
        client_ref: Option<String>,
        error: RoutingError,
    },
    /// An inbound frame that never reached the router
    Refused {
        reason: RefusedFrame,
        detail: String,
    },
    /// A message reached one of its recipient's connections for the first time
    Delivered {
        message_id: MessageId,
        conversation_id: ConversationId,
        recipient_id: UserId,
        delivered_at: Timestamp,
    },
}

/// Why an inbound frame was refused at the protocol level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefusedFrame {
    Unparseable,
    UnsupportedVersion,
    UnknownDestination,
}

/// Turns queue items into wire frames
pub trait FrameEncoder: Send + Sync {
    fn encode(&self, item: &Outbound) -> Result<String, serde_json::Error>;
}
