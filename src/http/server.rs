//! HTTP server setup.
//!
//! # Responsibilities
//! - Build the runtime snapshot (config, resource registry, upstream client)
//! - Create the Axum router with the catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Swap the runtime snapshot when a new configuration arrives
//! - Serve until the shutdown signal fires

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{routing::any, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::validation::{validate_config, ValidationError};
use crate::config::ProxyConfig;
use crate::http::handler::proxy_handler;
use crate::http::request::{UuidRequestId, X_REQUEST_ID};
use crate::observability::spans::request_span;
use crate::routing::ResourceRegistry;
use crate::upstream::UpstreamClient;

/// Error type for building the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("invalid configuration: {}", join_errors(.0))]
    Config(Vec<ValidationError>),
    #[error("failed to build upstream client: {0}")]
    Client(#[from] reqwest::Error),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Slack on top of connect + upstream time for reading the inbound body.
const DEADLINE_GRACE: Duration = Duration::from_secs(5);

/// Everything a request needs, replaced as a unit on reload.
#[derive(Debug)]
pub struct Runtime {
    pub config: ProxyConfig,
    pub registry: ResourceRegistry,
    pub upstream: UpstreamClient,
}

impl Runtime {
    pub fn build(config: ProxyConfig) -> Result<Self, ServerError> {
        validate_config(&config).map_err(ServerError::Config)?;
        let registry = ResourceRegistry::from_config(&config.resources).map_err(ServerError::Config)?;
        let upstream = UpstreamClient::new(&config.timeouts, &config.upstream)?;
        Ok(Self {
            config,
            registry,
            upstream,
        })
    }

    /// Upper bound for one request, body read included. Always longer than
    /// the upstream client's own deadline.
    pub fn request_deadline(&self) -> Duration {
        let timeouts = &self.config.timeouts;
        Duration::from_secs(timeouts.connect_secs + timeouts.upstream_secs) + DEADLINE_GRACE
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ArcSwap<Runtime>>,
}

impl AppState {
    /// Replace the runtime with one built from `config`. The old one stays
    /// in place if the new one cannot be built.
    pub fn reload(&self, config: ProxyConfig) -> Result<(), ServerError> {
        let current = self.runtime.load();
        if current.config.listener.bind_address != config.listener.bind_address {
            tracing::warn!(
                current = %current.config.listener.bind_address,
                requested = %config.listener.bind_address,
                "Bind address changes need a restart; keeping the current listener"
            );
        }

        let runtime = Runtime::build(config)?;
        tracing::info!(resources = runtime.registry.len(), "Configuration reloaded");
        self.runtime.store(Arc::new(runtime));
        Ok(())
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    /// Validate the configuration and build the server.
    pub fn new(config: ProxyConfig) -> Result<Self, ServerError> {
        let runtime = Runtime::build(config)?;
        for resource in runtime.registry.resources() {
            tracing::debug!(
                resource = %resource.name(),
                path = %resource.config.path,
                backend = %resource.base_url,
                auth = %resource.config.auth,
                "Resource registered"
            );
        }
        Ok(Self {
            state: AppState {
                runtime: Arc::new(ArcSwap::from_pointee(runtime)),
            },
        })
    }

    /// Handle on the shared runtime, for reloads and tests.
    pub fn state(&self) -> AppState {
        self.state.clone()
    }

    /// Build the Axum router with all middleware layers.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/", any(proxy_handler))
            .route("/{*path}", any(proxy_handler))
            .with_state(self.state.clone())
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(request_span))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
    }

    /// Serve on `listener` until `shutdown` fires, applying configuration
    /// updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<ProxyConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        let resources = self.state.runtime.load().registry.len();
        tracing::info!(address = %addr, resources, "HTTP server starting");

        let state = self.state.clone();
        let reloader = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = state.reload(config) {
                    tracing::error!(error = %e, "Rejected new configuration, keeping current one");
                }
            }
        });

        let app = self.router();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await;

        reloader.abort();
        tracing::info!("HTTP server stopped");
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResourceConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn config() -> ProxyConfig {
        let mut config = ProxyConfig::default();
        let mut archivos = ResourceConfig::new("archivos", "/api/archivos", "http://127.0.0.1:1/archivos");
        archivos.methods = vec!["POST".into()];
        archivos.cors = true;
        config.resources.push(archivos);
        config
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut config = config();
        config.resources[0].base_url = "nope".into();
        assert!(matches!(HttpServer::new(config), Err(ServerError::Config(_))));
    }

    #[tokio::test]
    async fn unknown_path_is_normalized_404() {
        let server = HttpServer::new(config()).unwrap();
        let response = server
            .router()
            .oneshot(Request::get("/api/nada").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(response.headers().contains_key("x-request-id"));
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], 404);
        assert_eq!(json["error"], "recurso no encontrado");
    }

    #[tokio::test]
    async fn unsupported_verb_is_405_with_cors() {
        let server = HttpServer::new(config()).unwrap();
        let response = server
            .router()
            .oneshot(Request::get("/api/archivos").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }

    #[tokio::test]
    async fn preflight_lists_methods() {
        let server = HttpServer::new(config()).unwrap();
        let response = server
            .router()
            .oneshot(
                Request::options("/api/archivos")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(response.headers()["access-control-allow-methods"], "POST, OPTIONS");
        assert_eq!(
            response.headers()["access-control-allow-headers"],
            "Content-Type, Authorization"
        );
        let body = to_bytes(response.into_body(), 1024).await.unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn reload_swaps_resources() {
        let server = HttpServer::new(config()).unwrap();
        let state = server.state();

        let mut next = config();
        next.resources.push(ResourceConfig::new("regiones", "/api/regiones", "http://127.0.0.1:1/r"));
        state.reload(next).unwrap();
        assert_eq!(state.runtime.load().registry.len(), 2);

        let mut broken = config();
        broken.timeouts.upstream_secs = 0;
        assert!(state.reload(broken).is_err());
        assert_eq!(state.runtime.load().registry.len(), 2);
    }

    #[test]
    fn deadline_follows_reloaded_timeouts() {
        let mut initial = config();
        initial.timeouts.connect_secs = 1;
        initial.timeouts.upstream_secs = 1;
        let server = HttpServer::new(initial).unwrap();
        let state = server.state();
        assert_eq!(state.runtime.load().request_deadline(), Duration::from_secs(7));

        let mut raised = config();
        raised.timeouts.connect_secs = 1;
        raised.timeouts.upstream_secs = 60;
        state.reload(raised).unwrap();
        assert_eq!(state.runtime.load().request_deadline(), Duration::from_secs(66));
    }
}
