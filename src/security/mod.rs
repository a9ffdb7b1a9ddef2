//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Buffered request
//!     → headers.rs (strip hop-by-hop, add X-Forwarded-For)
//!     → Forward to backend
//!     → headers.rs (strip hop-by-hop from the backend's response)
//! ```

pub mod headers;
