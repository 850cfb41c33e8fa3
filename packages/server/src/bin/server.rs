//! Yoriai collaborative room server.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin yoriai-server
//! cargo run --bin yoriai-server -- --host 0.0.0.0 --port 3000 --inactivity-threshold-secs 15
//! ```

use std::{sync::Arc, time::Duration};

use clap::Parser;
use yoriai_server::{
    AppState, Server, ServerConfig,
    config::{DEFAULT_HOST, DEFAULT_PORT},
    domain::PresencePolicy,
    infrastructure::{message_pusher::WebSocketMessagePusher, repository::InMemoryRoomRegistry},
};
use yoriai_shared::{logger::setup_logger, time::SystemClock};

#[derive(Parser, Debug)]
#[command(name = "yoriai-server")]
#[command(about = "Collaborative room server: shared code, chat and presence over WebSocket", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = DEFAULT_HOST)]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Seconds without a heartbeat before a participant is shown as inactive
    #[arg(long, default_value_t = 30)]
    inactivity_threshold_secs: u64,

    /// Seconds between presence sweeps
    #[arg(long, default_value_t = 30)]
    sweep_interval_secs: u64,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig {
            host: self.host,
            port: self.port,
            presence: PresencePolicy::new(
                Duration::from_secs(self.inactivity_threshold_secs),
                Duration::from_secs(self.sweep_interval_secs.max(1)),
            ),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &args.log_level);

    let config = args.into_config();

    // 1. Registry (in-memory rooms)
    let registry = Arc::new(InMemoryRoomRegistry::new());

    // 2. MessagePusher (WebSocket implementation)
    let message_pusher = Arc::new(WebSocketMessagePusher::new());

    // 3. UseCases
    let state = Arc::new(AppState::new(
        registry,
        message_pusher,
        Arc::new(SystemClock),
        config.presence,
    ));

    // 4. Run the server
    let server = Server::new(state, config);
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
