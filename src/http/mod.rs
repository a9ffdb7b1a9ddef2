//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing)
//!     → request.rs (buffer body, replayable copy)
//!     → [pool picks backend, dispatcher retries / fails over]
//!     → forward.rs (hyper client, one attempt against one backend)
//!     → response.rs (pass through, or 503)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use forward::{Forward, ForwardError, ForwardRequest, HyperForwarder};
pub use request::X_REQUEST_ID;
pub use server::BalancerServer;
