//! Yoriai collaborative room server.
//!
//! Participants in a room share one code buffer, one chat transcript and
//! presence, synchronized over WebSocket by this process.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;

pub use config::ServerConfig;
pub use ui::{AppState, Server, ServerSynchronizer};
