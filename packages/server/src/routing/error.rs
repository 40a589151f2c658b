//! Routing error taxonomy.

use thiserror::Error;

use crate::domain::{StoreError, TransportError, ValueObjectError};

/// Errors surfaced by the routing core
///
/// An offline recipient is not an error: it is reported through
/// [`DispatchOutcome`](super::DispatchOutcome).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoutingError {
    /// Malformed identifiers or payload, rejected before dispatch
    #[error("validation failed: {0}")]
    Validation(#[from] ValueObjectError),

    /// Read-only conversation lookup miss
    #[error("conversation not found")]
    NotFound,

    /// A bounded store or transport operation did not finish in time
    #[error("{operation} timed out after {attempts} attempt(s)")]
    Timeout {
        operation: &'static str,
        attempts: u32,
    },

    /// Transport failure in the middle of a delivery
    #[error("connection lost: {0}")]
    ConnectionLost(#[from] TransportError),

    /// Non-timeout store failure after retries
    #[error("store failure during {operation}: {source}")]
    Store {
        operation: &'static str,
        source: StoreError,
    },
}
