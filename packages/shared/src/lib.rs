//! Utilities shared by the dengon server and client.

pub mod logger;
pub mod time;
