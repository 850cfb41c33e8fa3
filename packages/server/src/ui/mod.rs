//! WebSocket room server: HTTP routing, connection handling and the
//! in-process synchronizer.

mod connection;
mod handler;
mod server;
mod signal;
pub mod state;
mod synchronizer;

pub use connection::{Connection, ConnectionState, Membership};
pub use server::Server;
pub use state::AppState;
pub use synchronizer::ServerSynchronizer;
