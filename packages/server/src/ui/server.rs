//! Server execution logic.

use std::{sync::Arc, time::Duration};

use axum::{Router, routing::get};
use tower_http::trace::TraceLayer;

use super::{
    handler::{health_check, websocket_handler},
    signal::shutdown_signal,
    state::AppState,
    sweeper::spawn_sweeper,
};

/// WebSocket chat relay server
///
/// # Example
///
/// ```ignore
/// let server = Server::new(Arc::new(AppState::build(store, &settings, clock, generator)));
/// server.run("127.0.0.1".to_string(), 3000, settings.sweep_interval).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn new(state: Arc<AppState>) -> Self {
        Self { state }
    }

    /// Routes served by the relay
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(websocket_handler))
            // HTTP エンドポイント
            .route("/api/health", get(health_check))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server and the expiry sweeper until a shutdown signal arrives
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails to bind to the specified address or
    /// if there's an error during server execution.
    pub async fn run(
        self,
        host: String,
        port: u16,
        sweep_interval: Duration,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let app = self.router();

        let bind_addr = format!("{}:{}", host, port);
        let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

        tracing::info!("Chat relay listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        let sweeper = spawn_sweeper(self.state.clone(), sweep_interval);

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await;
        sweeper.abort();
        served?;

        tracing::info!("Server shutdown complete");

        Ok(())
    }
}
