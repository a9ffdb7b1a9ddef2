//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges)
//!
//! Periodic:
//!     → load_report.rs (per-backend load snapshot every interval)
//! ```
//!
//! # Design Decisions
//! - Structured logging with per-backend fields
//! - Request ID flows through the HTTP trace span
//! - Metrics are cheap (atomic increments)

pub mod load_report;
pub mod logging;
pub mod metrics;
