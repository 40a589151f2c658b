//! Presence-aware routing core.
//!
//! Data flow for one message:
//!
//! ```text
//! Router::dispatch -> ConversationIndex::resolve -> ChatStore::save_message
//!                  -> ConnectionRegistry::lookup(recipient)
//!                  -> DeliveryQueue::enqueue (per connection)
//!                  -> DeliveryWriter -> FrameSink::send
//! ```

pub mod conversation_index;
pub mod delivery_queue;
pub mod error;
pub mod outbound;
pub mod registry;
pub mod retry;
pub mod router;

pub use conversation_index::ConversationIndex;
pub use delivery_queue::{
    DeliveryListener, DeliveryQueue, DeliveryWriter, EnqueueError, EnqueueOutcome, WriterExit,
};
pub use error::RoutingError;
pub use outbound::{FrameEncoder, Notice, Outbound, RefusedFrame};
pub use registry::{ConnectionHandle, ConnectionRegistry, RegistrationToken};
pub use router::{Attachment, DispatchOutcome, DispatchReceipt, FailureReason, Router};
