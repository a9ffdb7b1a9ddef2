//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → pool.rs (snapshot of registered backends)
//!     → least_conn.rs (pick alive backend with fewest in-flight requests)
//!     → backend.rs (hold a load guard while forwarding)
//!     → Return backend or None
//! ```
//!
//! # Design Decisions
//! - Load balancer is stateless; backends track their own load and liveness
//! - Per-backend atomics, no pool-wide lock
//! - Dead backends excluded from selection

use std::fmt;
use std::sync::Arc;

pub mod backend;
pub mod least_conn;
pub mod pool;

pub use backend::{Backend, LoadGuard};
pub use pool::{ConnPool, LoadSnapshot};

/// Backend selection strategy.
pub trait LoadBalancer: Send + Sync + fmt::Debug {
    fn next_server(&self, backends: &[Arc<Backend>]) -> Option<Arc<Backend>>;
}
