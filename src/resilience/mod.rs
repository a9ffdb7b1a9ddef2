//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to backend:
//!     → timeouts.rs (enforce per-attempt deadline)
//!     → On failure: retries.rs (retry same backend, or fail over, or give up)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Two bounded counters: retries per backend, attempts per request
//! - Transport failures are retried; HTTP error statuses are not

pub mod retries;
pub mod timeouts;
