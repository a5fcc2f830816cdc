use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use agora_store::{open_store, ContentStore, InMemoryContentStore};

use crate::config::ServiceConfig;
use crate::error::ServerResult;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ContentStore>,
    /// Cancelled on shutdown; every live stream is tied to it.
    pub shutdown: CancellationToken,
    /// Keep-alive interval for live streams.
    pub keep_alive: Duration,
}

impl AppState {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self {
            store,
            shutdown: CancellationToken::new(),
            keep_alive: Duration::from_secs(15),
        }
    }

    /// Open the configured backend.
    pub fn from_config(config: &ServiceConfig) -> ServerResult<Self> {
        let store = open_store(config.storage.kind, config.storage.options())?;
        Ok(Self::new(store).with_keep_alive(keep_alive_for(config.http_server.idle_timeout())))
    }

    /// State over a fresh in-memory store with default options.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryContentStore::new()))
    }

    pub fn with_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.keep_alive = keep_alive;
        self
    }
}

/// Half the idle timeout, so a quiet stream is pinged before it is reaped.
fn keep_alive_for(idle: Duration) -> Duration {
    (idle / 2).max(Duration::from_secs(1))
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("shutdown", &self.shutdown.is_cancelled())
            .field("keep_alive", &self.keep_alive)
            .finish_non_exhaustive()
    }
}
