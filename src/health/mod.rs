//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! Passive health checks (passive.rs):
//!     Periodic timer (monitor.rs)
//!     → TCP probe every backend concurrently
//!     → set alive / dead on the backend
//!
//! Request path (dispatch):
//!     Retry budget exhausted on a backend
//!     → mark it dead until the next successful probe
//! ```
//!
//! # Design Decisions
//! - One slow probe never stalls the others
//! - Liveness is per-backend, not per-pool
//! - A single successful probe brings a backend back

pub mod monitor;
pub mod passive;
