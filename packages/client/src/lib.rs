//! Interactive command-line client for the Dengon routing server.

pub mod domain;
pub mod error;
pub mod formatter;
pub mod runner;
mod session;
mod ui;

pub use runner::run_client;
