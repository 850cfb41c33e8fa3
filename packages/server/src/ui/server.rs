//! Server execution logic.

use std::{future::Future, sync::Arc};

use axum::{Router, routing::get};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;

use super::{
    handler::{health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
};

/// Build the HTTP / WebSocket router.
fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // WebSocket エンドポイント
        .route("/ws", get(websocket_handler))
        // HTTP エンドポイント
        .route("/api/health", get(health_check))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Collaborative room server
///
/// # Example
///
/// ```ignore
/// let state = Arc::new(AppState::new(registry, message_pusher, clock, config.presence));
/// Server::new(state, config).run().await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    config: ServerConfig,
}

impl Server {
    pub fn new(state: Arc<AppState>, config: ServerConfig) -> Self {
        Self { state, config }
    }

    /// Bind to the configured address and serve until Ctrl+C.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let bind_addr = format!("{}:{}", self.config.host, self.config.port);
        let listener = TcpListener::bind(&bind_addr).await?;
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::info!(
            "Yoriai server listening on {} (inactivity threshold: {:?}, sweep interval: {:?})",
            listener.local_addr()?,
            self.config.presence.inactivity_threshold,
            self.config.presence.sweep_interval
        );

        let sweeper = spawn_presence_sweeper(self.state.clone());
        let result = axum::serve(listener, router(self.state))
            .with_graceful_shutdown(shutdown)
            .await;
        sweeper.abort();
        result?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

/// Sweep presence on a fixed interval for the lifetime of the server.
fn spawn_presence_sweeper(state: Arc<AppState>) -> tokio::task::JoinHandle<()> {
    let period = state.sweep_presence_usecase.policy().sweep_interval;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // The first tick completes immediately.
        interval.tick().await;
        loop {
            interval.tick().await;
            let changed = state.sweep_presence_usecase.execute().await;
            tracing::debug!("Presence sweep finished ({} change(s))", changed);
        }
    })
}
