//! Least Connections load balancing strategy.

use std::sync::Arc;

use crate::load_balancer::{backend::Backend, LoadBalancer};

/// Least connections selector.
/// Selects the alive backend with the minimum number of in-flight requests.
#[derive(Debug, Default)]
pub struct LeastConnections;

impl LeastConnections {
    pub fn new() -> Self {
        Self
    }
}

impl LoadBalancer for LeastConnections {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>> {
        // Sort a private snapshot; loads keep moving while we look at them.
        let mut ranked: Vec<(usize, &Arc<Backend>)> =
            backends.iter().map(|b| (b.load(), b)).collect();

        // Stable: ties stay in registration order.
        ranked.sort_by_key(|(load, _)| *load);

        ranked
            .into_iter()
            .map(|(_, b)| b)
            .find(|b| b.is_alive())
            .cloned()
    }
}
