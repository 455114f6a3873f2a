//! aula-server - HTTP API for lesson management, processing, and chat
//!
//! The server owns no clients of its own; everything external arrives through
//! [`AppState`] as injected trait objects, so the same router runs against
//! real vendors in production and in-process fakes in tests.

pub mod error;
pub mod http;
pub mod middleware;
pub mod state;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::ApiError;
pub use http::create_router;
pub use middleware::AuthLayer;
pub use state::{AppState, ChatConfig};

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8420,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The aula HTTP server.
pub struct AulaServer {
    state: Arc<AppState>,
    auth_layer: AuthLayer,
    config: ServerConfig,
}

impl AulaServer {
    pub fn new(state: Arc<AppState>, auth_layer: AuthLayer, config: ServerConfig) -> Self {
        Self {
            state,
            auth_layer,
            config,
        }
    }

    /// Bind and serve until the shutdown token fires.
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ApiError> {
        let addr = self.config.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|source| ApiError::Bind {
                addr: addr.clone(),
                source,
            })?;
        info!(addr = %addr, "Server listening");

        let router = create_router(self.state, self.auth_layer);
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ApiError::Internal(format!("server error: {e}")))?;

        info!("Server stopped");
        Ok(())
    }
}
