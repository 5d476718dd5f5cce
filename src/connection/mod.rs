//! Signaling connection lifecycle

pub mod config;
pub mod manager;
pub mod state;

pub use config::{ConnectionOptions, ReconnectPolicy};
pub use manager::ConnectionManager;
pub use state::ConnectionState;
