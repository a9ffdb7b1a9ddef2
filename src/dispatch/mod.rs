//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Selected backend
//!     → forward request (load guard held)
//!     → success (any HTTP status) → response to client
//!     → transport failure:
//!         retry_count < max_retries → sleep backoff, same backend
//!         else mark dead → attempt_count += 1
//!             attempt_count > pool size → 503
//!             select_backend() → next backend, retry_count = 0
//!             nothing alive → 503
//! ```
//!
//! # Design Decisions
//! - Iterative loop with two bounded counters; no re-entry
//! - Failover dispatches to the exact backend it just selected
//! - Counters are request-scoped (see `resilience::retries`)

pub mod engine;

pub use engine::{DispatchError, Dispatched, Dispatcher};
