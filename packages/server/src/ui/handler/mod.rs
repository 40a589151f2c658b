//! Request handlers.

mod http;
mod websocket;

pub use http::{get_conversation, get_conversation_messages, get_online_users, health_check};
pub use websocket::websocket_handler;
