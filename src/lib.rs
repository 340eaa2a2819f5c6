// Public API for integration tests and potential library usage

pub mod api;
pub mod bots;
pub mod catalog;
pub mod config;
pub mod error;
pub mod origin;
pub mod protocol;
pub mod room;
pub mod state;
pub mod types;
pub mod ws;

// Re-export broadcast for testing
pub mod broadcast;
