//! Backend pool management.
//!
//! # Responsibilities
//! - Own the registered backends for the process lifetime
//! - Apply the load balancing algorithm to select a backend
//! - Run passive health checks and report per-backend load

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use crate::config::validation::parse_backend_url;
use crate::config::{ConfigError, ValidationError};
use crate::health::passive::probe;
use crate::http::forward::Forward;
use crate::load_balancer::{backend::Backend, least_conn::LeastConnections, LoadBalancer};
use crate::observability::metrics;

/// Point-in-time view of one backend, for reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadSnapshot {
    pub address: String,
    pub load: usize,
    pub alive: bool,
}

/// Fixed set of backends plus the selection policy.
#[derive(Debug)]
pub struct ConnPool {
    /// Registration order; membership never changes after `create`.
    backends: Vec<Arc<Backend>>,
    balancer: Box<dyn LoadBalancer>,
}

impl ConnPool {
    /// Build a pool from backend URLs. Every backend starts alive with zero load.
    pub fn create(hosts: &[String], forwarder: Arc<dyn Forward>) -> Result<Self, ConfigError> {
        if hosts.is_empty() {
            return Err(ValidationError::NoHosts.into());
        }

        let backends = hosts
            .iter()
            .map(|host| {
                let url = parse_backend_url(host)?;
                Ok(Arc::new(Backend::new(url, forwarder.clone())))
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        for (i, backend) in backends.iter().enumerate() {
            tracing::info!(backend = %backend.address(), index = i + 1, "Backend registered");
        }

        Ok(Self {
            backends,
            balancer: Box::new(LeastConnections::new()),
        })
    }

    /// Pick the least-loaded alive backend, or `None` if all are dead.
    pub fn select_backend(&self) -> Option<Arc<Backend>> {
        let selected = self.balancer.next_server(&self.backends);
        if selected.is_none() {
            tracing::debug!(backend_count = self.backends.len(), "No alive backends");
        }
        selected
    }

    /// Probe every backend concurrently and update its liveness.
    pub async fn health_check(&self, timeout: Duration) {
        let probes = self.backends.iter().map(|backend| async move {
            let result = probe(backend.address(), timeout).await;
            backend.set_alive(result.is_ok());

            match result {
                Ok(()) => tracing::info!(backend = %backend.address(), status = "ok", "Health check"),
                Err(e) => tracing::warn!(
                    backend = %backend.address(),
                    status = "error",
                    error = %e,
                    "Health check"
                ),
            }
            metrics::record_backend_alive(backend.address(), backend.is_alive());
        });

        join_all(probes).await;
    }

    /// Read-only load report in registration order.
    pub fn load_statistics(&self) -> Vec<LoadSnapshot> {
        self.backends
            .iter()
            .map(|b| LoadSnapshot {
                address: b.address().to_string(),
                load: b.load(),
                alive: b.is_alive(),
            })
            .collect()
    }

    /// Find a backend by its configured URL or its `host:port`.
    pub fn lookup_by_address(&self, address: &str) -> Option<Arc<Backend>> {
        self.backends
            .iter()
            .find(|b| b.address() == address || b.url().as_str() == address)
            .cloned()
    }

    pub fn backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}
