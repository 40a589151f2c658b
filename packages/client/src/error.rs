//! Error types for the Dengon client.

use thiserror::Error;

/// Client-specific errors
#[derive(Debug, Error, PartialEq)]
pub enum ClientError {
    /// The server refused the user id during the handshake
    #[error("User ID '{0}' was rejected by the server")]
    InvalidUserId(String),

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// A line that is not `@recipient message`
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
