use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::timeout::TimeoutLayer;

use crate::config::ServiceConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// Agora HTTP server.
pub struct AgoraServer {
    config: ServiceConfig,
    state: AppState,
}

impl AgoraServer {
    /// Open the configured store and prepare to serve.
    pub fn new(config: ServiceConfig) -> ServerResult<Self> {
        let state = AppState::from_config(&config)?;
        Ok(Self { config, state })
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Token that stops the server and every live stream when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.state.shutdown.clone()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.config.http_server.address
    }

    fn request_timeout(&self) -> Duration {
        self.config.http_server.timeout()
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone()).layer(TimeoutLayer::new(self.request_timeout()))
    }

    /// Serve until the shutdown token is cancelled.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.bind_addr()).await?;
        self.serve_on(listener).await
    }

    /// Serve on an already-bound listener.
    pub async fn serve_on(self, listener: TcpListener) -> ServerResult<()> {
        let app = self.router();
        let shutdown = self.shutdown_token();
        tracing::info!(
            address = %listener.local_addr()?,
            env = %self.config.env,
            storage = %self.config.storage.kind,
            "Agora server listening"
        );
        axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;
        tracing::info!("Agora server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_construction() {
        let server = AgoraServer::new(ServiceConfig::default()).unwrap();
        assert_eq!(server.bind_addr(), "127.0.0.1:8080".parse().unwrap());
        assert_eq!(server.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn router_builds() {
        let server = AgoraServer::new(ServiceConfig::default()).unwrap();
        let _router = server.router();
    }

    #[tokio::test]
    async fn serves_and_shuts_down() {
        let server = AgoraServer::new(ServiceConfig::default()).unwrap();
        let shutdown = server.shutdown_token();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let handle = tokio::spawn(server.serve_on(listener));

        shutdown.cancel();
        let result = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("server should stop")
            .expect("task should not panic");
        assert!(result.is_ok());
    }
}
