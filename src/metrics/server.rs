//! Scrape endpoint over live entropy state.
//!
//! Every `/metrics` request snapshots the shared [`EntropyState`] and
//! encodes it, so nothing has to push updates. `/health` answers 200 once
//! the root generator is keyed and 503 before.

use crate::metrics::{MetricsError, MetricsRegistry, MetricsSnapshot};
use crate::reseeding::RootGenerator;
use crate::state::EntropyState;
use axum::{
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::cors::CorsLayer;

/// Errors from running the metrics endpoint.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind metrics listener on {addr}: {source}")]
    Bind {
        /// Address that was requested.
        addr: SocketAddr,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop stopped with an error.
    #[error("metrics server failed: {0}")]
    Serve(#[source] std::io::Error),
}

/// Where the metrics endpoint listens.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self::with_port(9090)
    }
}

impl MetricsServerConfig {
    /// Loopback on `port`.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([127, 0, 0, 1], port).into(),
        }
    }
}

/// What the handlers share: the state to observe and the registry that
/// encodes it.
struct Scrape<R> {
    state: Arc<EntropyState<R>>,
    registry: MetricsRegistry,
}

impl<R: RootGenerator> Scrape<R> {
    fn render(&self) -> Result<String, MetricsError> {
        self.registry.update(&MetricsSnapshot::from_state(&self.state));
        self.registry.encode()
    }

    fn health(&self) -> (StatusCode, String) {
        match self.state.root().generation() {
            0 => (StatusCode::SERVICE_UNAVAILABLE, "unkeyed\n".to_string()),
            generation => (StatusCode::OK, format!("keyed generation={}\n", generation)),
        }
    }
}

/// HTTP server exposing one [`EntropyState`] to Prometheus.
pub struct MetricsServer<R> {
    config: MetricsServerConfig,
    scrape: Arc<Scrape<R>>,
}

impl<R: RootGenerator + 'static> MetricsServer<R> {
    /// Serves `state` through `registry`.
    pub fn new(
        config: MetricsServerConfig,
        state: Arc<EntropyState<R>>,
        registry: MetricsRegistry,
    ) -> Self {
        Self {
            config,
            scrape: Arc::new(Scrape { state, registry }),
        }
    }

    /// The `/metrics` and `/health` routes, for mounting elsewhere.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler::<R>))
            .route("/health", get(health_handler::<R>))
            .layer(CorsLayer::permissive())
            .with_state(Arc::clone(&self.scrape))
    }

    /// Binds and serves until the runtime shuts down.
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.bind_addr;
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;

        tracing::info!(addr = %addr, "Metrics server listening");

        axum::serve(listener, app).await.map_err(ServerError::Serve)
    }
}

async fn metrics_handler<R: RootGenerator + 'static>(
    State(scrape): State<Arc<Scrape<R>>>,
) -> impl IntoResponse {
    match scrape.render() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

async fn health_handler<R: RootGenerator + 'static>(
    State(scrape): State<Arc<Scrape<R>>>,
) -> impl IntoResponse {
    scrape.health()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReseedConfig;
    use crate::harvest::HarvestedEvent;
    use crate::reseeding::ChaChaRoot;
    use crate::source::EntropySource;

    fn server() -> (Arc<EntropyState<ChaChaRoot>>, MetricsServer<ChaChaRoot>) {
        let state = Arc::new(EntropyState::new(&ReseedConfig::default(), ChaChaRoot::new()));
        let server = MetricsServer::new(
            MetricsServerConfig::default(),
            Arc::clone(&state),
            MetricsRegistry::new().unwrap(),
        );
        (state, server)
    }

    #[test]
    fn test_config_default_is_loopback() {
        let config = MetricsServerConfig::default();
        assert_eq!(config.bind_addr.port(), 9090);
        assert!(config.bind_addr.ip().is_loopback());
    }

    #[test]
    fn test_health_tracks_keying() {
        let (state, server) = server();
        assert_eq!(server.scrape.health().0, StatusCode::SERVICE_UNAVAILABLE);

        state.ensure_seeded();
        let (status, body) = server.scrape.health();
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "keyed generation=1\n");
    }

    #[test]
    fn test_scrape_reads_current_state() {
        let (state, server) = server();
        let first = server.scrape.render().unwrap();
        assert!(first.contains("fenestras_root_generation 0"));

        state.process_event(&HarvestedEvent::new(EntropySource::Keyboard, &[1, 2], 0, 0));
        state.ensure_seeded();

        let second = server.scrape.render().unwrap();
        assert!(second.contains("fenestras_root_generation 1"));
        assert!(second.contains("fenestras_seen_sources 1"));
        assert!(second.contains("fenestras_events_bootstrap_total 1"));
    }

    #[tokio::test]
    async fn test_metrics_handler_responds() {
        let (state, server) = server();
        state.ensure_seeded();

        let response = metrics_handler(State(Arc::clone(&server.scrape)))
            .await
            .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("fenestras_root_generation 1"));
    }
}
