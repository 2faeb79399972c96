//! HTTP server assembly for Streamgate
//!
//! Wires the metadata cache, the stream concurrency limit, and the streaming
//! routes into an axum router, and runs it until Ctrl-C.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::get;
use streamgate_core::config::{StreamgateConfig, StreamingConfig};
use streamgate_core::{MetadataCache, RemoteObjectClient, Result};
use tokio::sync::Semaphore;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::handlers::{download, download_unnamed, health_check, home_page, preflight, watch};

/// State shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub cache: Arc<MetadataCache>,
    pub streaming: StreamingConfig,
    pub stream_slots: Arc<Semaphore>,
    pub started_at: Instant,
}

impl AppState {
    /// Builds state around `client` using the cache and streaming settings of `config`.
    pub fn new(client: Arc<dyn RemoteObjectClient>, config: &StreamgateConfig) -> Self {
        Self {
            cache: Arc::new(MetadataCache::with_capacity(client, config.cache.capacity)),
            streaming: config.streaming.clone(),
            stream_slots: Arc::new(Semaphore::new(config.streaming.max_concurrent_streams)),
            started_at: Instant::now(),
        }
    }

    /// Response bodies currently streaming.
    pub fn active_streams(&self) -> usize {
        self.streaming
            .max_concurrent_streams
            .saturating_sub(self.stream_slots.available_permits())
    }
}

/// Builds the application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home_page))
        .route("/health", get(health_check))
        // Streaming endpoints
        .route("/watch/{handle}", get(watch).head(watch).options(preflight))
        .route(
            "/download/{handle}",
            get(download_unnamed)
                .head(download_unnamed)
                .options(preflight),
        )
        .route(
            "/download/{handle}/{name}",
            get(download).head(download).options(preflight),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serves `client` over HTTP until the process receives Ctrl-C.
///
/// # Errors
///
/// - `StreamgateError::Configuration` - Zero chunk size or stream limit
/// - `StreamgateError::Io` - The listener cannot bind, or serving fails
pub async fn run_server(
    config: StreamgateConfig,
    client: Arc<dyn RemoteObjectClient>,
) -> Result<()> {
    config.validate()?;

    let backend = client.client_name();
    let state = AppState::new(client, &config);
    let app = build_router(state);

    let address = config.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address).await?;

    info!(
        "Streamgate running on http://{} (backend: {}, links: {})",
        listener.local_addr()?,
        backend,
        config.server.base_url()
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutdown requested");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use streamgate_core::{ConfigError, StreamgateError};
    use streamgate_sim::InMemoryObjectClient;

    use super::*;

    #[tokio::test]
    async fn invalid_config_is_rejected_before_binding() {
        let mut config = StreamgateConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = 0;
        config.streaming.chunk_size = 0;

        let result = run_server(config, Arc::new(InMemoryObjectClient::new())).await;
        assert!(matches!(
            result,
            Err(StreamgateError::Configuration(ConfigError::ZeroChunkSize))
        ));
    }

    #[tokio::test]
    async fn occupied_port_is_an_io_error() {
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut config = StreamgateConfig::default();
        config.server.host = "127.0.0.1".to_string();
        config.server.port = taken.local_addr().unwrap().port();

        let result = run_server(config, Arc::new(InMemoryObjectClient::new())).await;
        match result {
            Err(StreamgateError::Io(error)) => {
                assert_eq!(error.kind(), std::io::ErrorKind::AddrInUse);
            }
            other => panic!("expected bind failure, got {other:?}"),
        }
    }
}
