//! Backend abstraction.
//!
//! # Responsibilities
//! - Represent a single backend service instance
//! - Track in-flight requests (for Least Connections LB)
//! - Track liveness (alive/dead)
//! - Forward requests through the shared transport

use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::Response;
use url::Url;

use crate::http::forward::{authority_of, Forward, ForwardError, ForwardRequest};

/// A single backend server.
pub struct Backend {
    /// The URL this backend was registered with.
    url: Url,
    /// `host:port` used for probing and reporting.
    address: String,
    /// Liveness flag, flipped by health checks and dispatch failures.
    alive: AtomicBool,
    /// Number of requests currently being handled.
    load: AtomicUsize,
    forwarder: Arc<dyn Forward>,
}

impl fmt::Debug for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Backend")
            .field("address", &self.address)
            .field("alive", &self.is_alive())
            .field("load", &self.load())
            .finish()
    }
}

impl Backend {
    /// Create a new backend. Starts alive with zero load.
    pub fn new(url: Url, forwarder: Arc<dyn Forward>) -> Self {
        let address = authority_of(&url);
        Self {
            url,
            address,
            alive: AtomicBool::new(true),
            load: AtomicUsize::new(0),
            forwarder,
        }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// `host:port` of this backend.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::Acquire)
    }

    pub fn set_alive(&self, alive: bool) {
        self.alive.store(alive, Ordering::Release);
    }

    /// Current number of in-flight requests.
    pub fn load(&self) -> usize {
        self.load.load(Ordering::Relaxed)
    }

    pub fn set_load(&self, load: usize) {
        self.load.store(load, Ordering::Relaxed);
    }

    pub fn incr_load(&self) {
        self.load.fetch_add(1, Ordering::Relaxed);
    }

    /// Decrement the load, saturating at zero.
    pub fn decr_load(&self) {
        let _ = self
            .load
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Count one in-flight request until the guard is dropped.
    pub fn track_load(self: &Arc<Self>) -> LoadGuard {
        self.incr_load();
        LoadGuard {
            backend: self.clone(),
        }
    }

    /// Forward a request to this backend.
    pub async fn forward(&self, request: &ForwardRequest) -> Result<Response<Body>, ForwardError> {
        self.forwarder.forward(&self.url, request).await
    }
}

/// A RAII guard that holds one unit of a backend's load.
#[derive(Debug)]
pub struct LoadGuard {
    backend: Arc<Backend>,
}

impl Deref for LoadGuard {
    type Target = Backend;
    fn deref(&self) -> &Self::Target {
        &self.backend
    }
}

impl Drop for LoadGuard {
    fn drop(&mut self) {
        self.backend.decr_load();
    }
}
