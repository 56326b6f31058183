//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the proxy routes and fallback
//! - Wire up middleware (request ID, tracing, edge middleware)
//! - Bind server to listener
//! - Drain in-flight requests on shutdown

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::{HeaderName, StatusCode},
    middleware,
    response::Response,
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use url::Url;

use crate::config::{GatewayConfig, UpstreamConfig};
use crate::http::middleware::edge_middleware;
use crate::http::proxy::{parse_upstream_base, proxy_handler};
use crate::http::request::{MakeRequestUuidV4, X_REQUEST_ID};
use crate::http::response::json_error;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub client: reqwest::Client,
    /// `None` when the worker URL is missing or unusable.
    pub upstream_base: Option<Url>,
    pub api_prefix: Arc<str>,
    pub timeout: Duration,
    pub max_body_bytes: usize,
}

impl AppState {
    /// Build the handler state from the upstream section of the config.
    pub fn from_config(config: &UpstreamConfig) -> Result<Self, reqwest::Error> {
        // Redirects are relayed to the caller, not followed.
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let upstream_base = parse_upstream_base(config.worker_url.as_deref());
        if upstream_base.is_none() {
            tracing::warn!(
                worker_url = ?config.worker_url,
                "WORKER_URL missing or invalid; proxied requests will fail with 500"
            );
        }

        Ok(Self {
            client,
            upstream_base,
            api_prefix: Arc::from(config.api_prefix.as_str()),
            timeout: Duration::from_millis(config.timeout_ms),
            max_body_bytes: config.max_body_bytes,
        })
    }
}

/// HTTP server for the edge gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: GatewayConfig) -> Result<Self, reqwest::Error> {
        let state = AppState::from_config(&config.upstream)?;
        let router = Self::build_router(&config.upstream.api_prefix, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(api_prefix: &str, state: AppState) -> Router {
        let request_id_header = HeaderName::from_static(X_REQUEST_ID);

        Router::new()
            .route(api_prefix, any(proxy_handler))
            .route(&format!("{api_prefix}/"), any(proxy_handler))
            .route(&format!("{api_prefix}/{{*path}}"), any(proxy_handler))
            .fallback(not_found)
            .with_state(state)
            .layer(middleware::from_fn(edge_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(request_id_header.clone(), MakeRequestUuidV4))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::new(request_id_header)),
            )
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            api_prefix = %self.config.upstream.api_prefix,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The fully layered router, for driving the gateway without a socket.
    pub fn into_router(self) -> Router {
        self.router
    }
}

/// Paths outside the API prefix. Static assets are not served here.
async fn not_found() -> Response {
    json_error(StatusCode::NOT_FOUND, "Not found")
}
