//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with a single catch-all proxy handler
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener
//! - Launch the health check and load report loops
//! - Hand each request to the pool and the dispatcher

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use crate::config::{BalancerConfig, ConfigError};
use crate::dispatch::Dispatcher;
use crate::health::monitor::HealthMonitor;
use crate::http::forward::HyperForwarder;
use crate::http::request::{
    buffer_request, propagate_request_id_layer, request_id, set_request_id_layer, BodyError,
};
use crate::http::response::{bad_request, payload_too_large};
use crate::lifecycle::Shutdown;
use crate::load_balancer::ConnPool;
use crate::observability::{load_report::LoadReporter, metrics};
use crate::resilience::retries::RetryPolicy;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Dispatcher,
    pub max_body_bytes: usize,
}

/// The balancer front-end.
pub struct BalancerServer {
    router: Router,
    config: BalancerConfig,
    pool: Arc<ConnPool>,
}

impl BalancerServer {
    /// Create a server over an existing pool.
    pub fn new(config: BalancerConfig, pool: Arc<ConnPool>) -> Self {
        let state = AppState {
            dispatcher: Dispatcher::new(pool.clone(), RetryPolicy::from(&config.retries)),
            max_body_bytes: config.limits.max_body_bytes,
        };

        let router = Self::build_router(state);
        Self {
            router,
            config,
            pool,
        }
    }

    /// Build the pool from `config.hosts` with the hyper transport.
    pub fn from_config(config: BalancerConfig) -> Result<Self, ConfigError> {
        let forwarder = HyperForwarder::new(Duration::from_secs(config.timeouts.forward_secs));
        let pool = ConnPool::create(&config.hosts, Arc::new(forwarder))?;
        Ok(Self::new(config, Arc::new(pool)))
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            method = %request.method(),
                            uri = %request.uri(),
                            request_id = %request_id(request),
                        )
                    }))
                    .layer(propagate_request_id_layer()),
            )
    }

    /// Bind the configured address and serve until shutdown.
    pub async fn start(self, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let listener = TcpListener::bind(self.config.bind_address()).await?;
        self.run(listener, shutdown).await
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;

        let monitor = HealthMonitor::new(self.pool.clone(), &self.config.health_check);
        tokio::spawn(monitor.run(shutdown.subscribe()));

        let reporter = LoadReporter::new(self.pool.clone(), &self.config.load_report);
        tokio::spawn(reporter.run(shutdown.subscribe()));

        tracing::info!(
            address = %addr,
            backends = self.pool.len(),
            "Load-balancer service started"
        );

        let mut stop = shutdown.subscribe();
        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop.recv().await;
            })
            .await?;

        tracing::info!("Load-balancer service stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &BalancerConfig {
        &self.config
    }

    pub fn pool(&self) -> &Arc<ConnPool> {
        &self.pool
    }
}

/// Main proxy handler.
/// Buffers the request, selects a backend, and dispatches with retry/failover.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let forward = match buffer_request(request, state.max_body_bytes).await {
        Ok(forward) => forward,
        Err(e @ BodyError::TooLarge(_)) => {
            tracing::warn!(error = %e, "Rejecting request body");
            metrics::record_request(413);
            return payload_too_large();
        }
        Err(e) => {
            tracing::warn!(error = %e, "Rejecting request body");
            metrics::record_request(400);
            return bad_request();
        }
    };

    let initial = state.dispatcher.pool().select_backend();
    match state.dispatcher.dispatch(initial, &forward).await {
        Ok(done) => {
            let status = done.response.status();
            tracing::debug!(
                backend = %done.backend,
                status = status.as_u16(),
                retries = done.attempts.retry_count,
                attempt = done.attempts.attempt_count,
                "Request forwarded"
            );
            metrics::record_request(status.as_u16());
            done.response
        }
        Err(e) => {
            tracing::warn!(
                error = %e,
                attempt = e.attempts().attempt_count,
                "Service not available"
            );
            metrics::record_request(503);
            e.into_response()
        }
    }
}
