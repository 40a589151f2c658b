//! Presence-aware direct-message routing server.
//!
//! Resolves the conversation of an unordered sender/recipient pair and
//! delivers each message over the recipient's live WebSocket connection(s),
//! keeping messages for offline recipients pending until they reconnect.

pub mod config;

// layers
pub mod domain;
pub mod infrastructure;
pub mod routing;
pub mod ui;
pub mod usecase;
